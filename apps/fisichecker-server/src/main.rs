//! FisiChecker server
//!
//! Hosts the audits module behind an axum HTTP server.

mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::Router;
use clap::Parser;
use sea_orm::{ConnectOptions, Database};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use audits::AuditsModule;
use config::{AppConfig, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "fisichecker-server", version, about = "WCAG audit server")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = AppConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        cfg.server.bind = bind;
    }

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    logging::init(&cfg.logging);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting fisichecker-server");

    let mut options = ConnectOptions::new(cfg.database.url.clone());
    options
        .max_connections(cfg.database.max_connections)
        .sqlx_logging(false);
    let db = Arc::new(
        Database::connect(options)
            .await
            .with_context(|| format!("cannot connect to database '{}'", cfg.database.url))?,
    );

    let module = AuditsModule::default();
    module.migrate(&db).await?;
    module.init(cfg.audits.clone(), db.clone())?;

    let app = layered(module.register_rest(Router::new())?, &cfg.server);

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("cannot bind {}", cfg.server.bind))?;
    tracing::info!(addr = %cfg.server.bind, "listening");

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn layered(router: Router, cfg: &ServerConfig) -> Router {
    let cors = if cfg.cors_origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = cfg
            .cors_origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    router
        .layer(RequestBodyLimitLayer::new(cfg.body_limit_bytes))
        .layer(TimeoutLayer::new(cfg.request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
    cancel.cancel();
}
