use std::{process, sync::Arc};

use scrivano::{
    application::{error::AppError, generate::GenerateService},
    config,
    infra::{
        artifacts::ArtifactStore,
        error::InfraError,
        http::{self, AppState},
        renderer::CliHandRenderer,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(error) = boot() {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

fn boot() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(threads) = settings.server.worker_threads {
        builder.worker_threads(threads.get());
    }
    let runtime = builder
        .build()
        .map_err(|err| AppError::from(InfraError::Io(err)))?;

    runtime.block_on(run_serve(settings))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let renderer = Arc::new(CliHandRenderer::new(settings.renderer.cli_path.clone()));
    let artifacts = ArtifactStore::new(settings.renderer.spool_dir.clone())
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let generate = Arc::new(GenerateService::new(
        renderer,
        artifacts,
        settings.limits,
        settings.renderer.timeout,
    ));

    let state = AppState {
        generate,
        default_delivery: settings.delivery.default_mode,
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.bind_addr)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;

    info!(
        target = "scrivano::server",
        addr = %settings.server.bind_addr,
        renderer = %settings.renderer.cli_path.display(),
        "Listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!(target = "scrivano::server", "Shutdown signal received");
}
