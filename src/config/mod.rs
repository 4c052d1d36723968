//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::NonZeroUsize,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::request::{DeliveryMode, Limits, MAX_LINE_CHARS, MAX_LINES, MAX_TEXT_CHARS};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "scrivano";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_RENDERER_CLI: &str = "handwrite";
const DEFAULT_SPOOL_DIR: &str = "/tmp/scrivano-spool";
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 300;

/// Command-line arguments for the Scrivano binary.
#[derive(Debug, Parser)]
#[command(name = "scrivano", version, about = "Scrivano handwriting server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SCRIVANO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the number of runtime worker threads.
    #[arg(long = "server-worker-threads", value_name = "COUNT")]
    pub server_worker_threads: Option<usize>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the total input character cap.
    #[arg(long = "limits-max-text-chars", value_name = "COUNT")]
    pub limits_max_text_chars: Option<usize>,

    /// Override the per-line character budget.
    #[arg(long = "limits-max-line-chars", value_name = "COUNT")]
    pub limits_max_line_chars: Option<usize>,

    /// Override the rendered line cap.
    #[arg(long = "limits-max-lines", value_name = "COUNT")]
    pub limits_max_lines: Option<usize>,

    /// Override the handwriting CLI executable path.
    #[arg(long = "renderer-cli-path", value_name = "PATH")]
    pub renderer_cli_path: Option<PathBuf>,

    /// Override the artifact spool directory.
    #[arg(long = "renderer-spool-dir", value_name = "PATH")]
    pub renderer_spool_dir: Option<PathBuf>,

    /// Override the renderer timeout.
    #[arg(long = "renderer-timeout-seconds", value_name = "SECONDS")]
    pub renderer_timeout_seconds: Option<u64>,

    /// Override the default delivery mode (stream|inline).
    #[arg(long = "delivery-default", value_name = "MODE")]
    pub delivery_default: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub limits: Limits,
    pub renderer: RendererSettings,
    pub delivery: DeliverySettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind_addr: SocketAddr,
    /// `None` leaves the runtime at its own default.
    pub worker_threads: Option<NonZeroUsize>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub cli_path: PathBuf,
    pub spool_dir: PathBuf,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub default_mode: DeliveryMode,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Parse the CLI and load settings in one step.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("SCRIVANO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    limits: RawLimitSettings,
    renderer: RawRendererSettings,
    delivery: RawDeliverySettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    worker_threads: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLimitSettings {
    max_text_chars: Option<usize>,
    max_line_chars: Option<usize>,
    max_lines: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRendererSettings {
    cli_path: Option<PathBuf>,
    spool_dir: Option<PathBuf>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDeliverySettings {
    default: Option<String>,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(threads) = overrides.server_worker_threads {
            self.server.worker_threads = Some(threads);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(value) = overrides.limits_max_text_chars {
            self.limits.max_text_chars = Some(value);
        }
        if let Some(value) = overrides.limits_max_line_chars {
            self.limits.max_line_chars = Some(value);
        }
        if let Some(value) = overrides.limits_max_lines {
            self.limits.max_lines = Some(value);
        }
        if let Some(path) = overrides.renderer_cli_path.as_ref() {
            self.renderer.cli_path = Some(path.clone());
        }
        if let Some(dir) = overrides.renderer_spool_dir.as_ref() {
            self.renderer.spool_dir = Some(dir.clone());
        }
        if let Some(seconds) = overrides.renderer_timeout_seconds {
            self.renderer.timeout_seconds = Some(seconds);
        }
        if let Some(mode) = overrides.delivery_default.as_ref() {
            self.delivery.default = Some(mode.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            limits,
            renderer,
            delivery,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            limits: build_limits(limits)?,
            renderer: build_renderer_settings(renderer)?,
            delivery: build_delivery_settings(delivery)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let bind_addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.bind_addr", reason))?;

    let worker_threads = match server.worker_threads {
        Some(count) => Some(
            NonZeroUsize::new(count)
                .ok_or_else(|| LoadError::invalid("server.worker_threads", "must be greater than zero"))?,
        ),
        None => None,
    };

    Ok(ServerSettings {
        bind_addr,
        worker_threads,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_limits(limits: RawLimitSettings) -> Result<Limits, LoadError> {
    let max_text_chars = non_zero_usize(
        limits.max_text_chars.unwrap_or(MAX_TEXT_CHARS),
        "limits.max_text_chars",
    )?;
    let max_line_chars = non_zero_usize(
        limits.max_line_chars.unwrap_or(MAX_LINE_CHARS),
        "limits.max_line_chars",
    )?;
    let max_lines = non_zero_usize(limits.max_lines.unwrap_or(MAX_LINES), "limits.max_lines")?;

    Ok(Limits {
        max_text_chars,
        max_line_chars,
        max_lines,
    })
}

fn build_renderer_settings(renderer: RawRendererSettings) -> Result<RendererSettings, LoadError> {
    let cli_path = renderer
        .cli_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RENDERER_CLI));
    let spool_dir = renderer
        .spool_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SPOOL_DIR));

    let timeout_seconds = renderer
        .timeout_seconds
        .unwrap_or(DEFAULT_RENDER_TIMEOUT_SECS);
    if timeout_seconds == 0 {
        return Err(LoadError::invalid(
            "renderer.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(RendererSettings {
        cli_path,
        spool_dir,
        timeout: Duration::from_secs(timeout_seconds),
    })
}

fn build_delivery_settings(delivery: RawDeliverySettings) -> Result<DeliverySettings, LoadError> {
    let default_mode = match delivery.default.as_deref() {
        None => DeliveryMode::default(),
        Some("stream") => DeliveryMode::Stream,
        Some("inline") => DeliveryMode::Inline,
        Some(other) => {
            return Err(LoadError::invalid(
                "delivery.default",
                format!("unknown mode `{other}` (expected stream|inline)"),
            ));
        }
    };

    Ok(DeliverySettings { default_mode })
}

fn non_zero_usize(value: usize, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    format!("{host}:{port}")
        .parse()
        .map_err(|err| format!("failed to parse `{host}:{port}`: {err}"))
}

#[cfg(test)]
mod tests;
