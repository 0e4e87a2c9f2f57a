mod catalog;
mod config;
mod constants;
mod content;
mod database;
mod error;
mod github;
mod html;
mod integrations;
mod params;
mod rate_limit;
mod routes;
mod sitemap;
mod svg;
mod tags;

use config::AppConfig;
use database::Database;
use routes::AppState;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portfolio_server=info,tower_http=info".into()),
        )
        .compact()
        .init();

    let config = AppConfig::from_env();
    let port = config.port;

    let database = match Database::connect(&config.database_url).await {
        Ok(database) => Some(database),
        Err(err) => {
            warn!("database unavailable, comments and reactions are disabled: {err}");
            None
        }
    };

    if config.openai_api_key.is_none() {
        info!("OPENAI_API_KEY not set; summarization relies on the site config key");
    }

    let state = AppState::new(config, database)?;
    state.limiter.spawn_purger();
    spawn_reload_on_hangup(state.clone());

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::UNSPECIFIED, port)).await?;
    info!("listening on 0.0.0.0:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// SIGHUP drops cached content so edited data and posts show up right away.
#[cfg(unix)]
fn spawn_reload_on_hangup(state: AppState) {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(err) => {
                warn!("failed to install SIGHUP handler: {err}");
                return;
            }
        };
        while hangup.recv().await.is_some() {
            if let Err(err) = state.reload_content().await {
                error!("content reload failed: {err}");
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_on_hangup(_state: AppState) {}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");
}
