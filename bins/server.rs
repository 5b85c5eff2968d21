//! Mock auth API for the payment dashboard.

use std::process::ExitCode;

use tracing::{error, info, warn};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // without a signal handler the server runs until killed
        warn!(error = %e, "ctrl_c handler unavailable");
        std::future::pending::<()>().await;
    }
    info!(event = "shutdown_signal", "received Ctrl+C, draining connections");
}

fn main() -> ExitCode {
    let cfg = match server::init() {
        Ok(cfg) => cfg,
        Err(e) => {
            // logging may not be up yet
            eprintln!("startup failed: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    std::panic::set_hook(Box::new(|info| {
        error!(event = "panic", pid = std::process::id(), message = %info, "unhandled panic");
    }));

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(threads) = cfg.server.worker_threads {
        builder.worker_threads(threads);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    info!(
        event = "start",
        instance = %uuid::Uuid::new_v4(),
        version = env!("CARGO_PKG_VERSION"),
        threads = cfg.server.worker_threads.unwrap_or_default(),
        "mock auth api starting"
    );

    match rt.block_on(server::run(cfg, shutdown_signal())) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(event = "run_failed", error = %e, "mock auth api exited with error");
            ExitCode::FAILURE
        }
    }
}
