use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::Router;
use common::utils::logging::{init_logging_default, init_logging_json};
use configs::AppConfig;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes::{self, auth};
use service::auth::repo::JsonUserRepository;
use service::auth::service::{AuthConfig, AuthService};
use service::runtime;

/// Initialize logging via shared common utils; `LOG_FORMAT=json` selects structured output
fn init_logging() {
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => init_logging_json(),
        _ => init_logging_default(),
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("server address: {e}")))
}

/// Open the user table and assemble the mock backend's router.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    runtime::ensure_parent_dir(&cfg.mock.users_path).await?;
    let repo = JsonUserRepository::open(&cfg.mock.users_path).await?;
    let backend = AuthService::new(Arc::new(repo), AuthConfig::from_mock_config(&cfg.mock));
    let state = auth::ServerState::new(Arc::new(backend));
    Ok(routes::build_router(state, build_cors()))
}

/// Serve `app` on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

/// Process setup, run once before the runtime starts: `.env`, logging, configuration.
pub fn init() -> anyhow::Result<AppConfig> {
    dotenv().ok();
    init_logging();
    AppConfig::load_or_default()
}

/// Build the app from `cfg` and serve it until `shutdown` resolves.
pub async fn run<F>(cfg: AppConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_app(&cfg).await?;

    let addr = bind_addr(&cfg)?;
    info!(%addr, users = %cfg.mock.users_path, login_delay_ms = cfg.mock.login_delay_ms, "starting mock auth api");
    let listener = TcpListener::bind(addr).await?;
    serve(listener, app, shutdown).await?;
    info!("mock auth api stopped");
    Ok(())
}
