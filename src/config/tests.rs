use super::*;

#[test]
fn defaults_match_the_deployed_limits() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.bind_addr.port(), 5000);
    assert_eq!(settings.limits.max_text_chars.get(), 500);
    assert_eq!(settings.limits.max_line_chars.get(), 75);
    assert_eq!(settings.limits.max_lines.get(), 7);
    assert_eq!(settings.renderer.timeout.as_secs(), 300);
    assert!(matches!(settings.delivery.default_mode, DeliveryMode::Stream));
    assert!(settings.server.worker_threads.is_none());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.bind_addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn limit_overrides_flow_into_the_typed_limits() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        limits_max_text_chars: Some(1000),
        limits_max_line_chars: Some(60),
        limits_max_lines: Some(17),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.limits.max_text_chars.get(), 1000);
    assert_eq!(settings.limits.max_line_chars.get(), 60);
    assert_eq!(settings.limits.max_lines.get(), 17);
}

#[test]
fn zero_valued_limits_are_rejected() {
    let mut raw = RawSettings::default();
    raw.limits.max_line_chars = Some(0);

    let err = Settings::from_raw(raw).expect_err("invalid settings");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "limits.max_line_chars",
            ..
        }
    ));
}

#[test]
fn zero_timeout_is_rejected() {
    let mut raw = RawSettings::default();
    raw.renderer.timeout_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("invalid settings");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "renderer.timeout_seconds",
            ..
        }
    ));
}

#[test]
fn unknown_delivery_mode_is_rejected() {
    let mut raw = RawSettings::default();
    raw.delivery.default = Some("carrier-pigeon".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid settings");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "delivery.default",
            ..
        }
    ));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["scrivano"]);
    assert!(args.command.is_none());
}

#[test]
fn parse_serve_arguments() {
    let args = CliArgs::parse_from([
        "scrivano",
        "serve",
        "--server-port",
        "8080",
        "--renderer-cli-path",
        "/usr/local/bin/handwrite",
        "--delivery-default",
        "inline",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_port, Some(8080));
            assert_eq!(
                serve.overrides.renderer_cli_path,
                Some(PathBuf::from("/usr/local/bin/handwrite"))
            );
            assert_eq!(serve.overrides.delivery_default.as_deref(), Some("inline"));
        }
    }
}
