//! Module declaration and lifecycle

use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;

use crate::ai::{AiReviewer, OllamaClient, OllamaReviewer};
use crate::config::Config;
use crate::contract::AuditsApi;
use crate::domain::Service;
use crate::engine::{Auditor, HttpRenderer, ReqwestFetcher};
use crate::infra::storage::{Migrator, SeaOrmAuditRepository};

/// Audits module: engine, persistence and REST surface
pub struct AuditsModule {
    config: RwLock<Config>,
    service: RwLock<Option<Arc<Service>>>,
}

impl Default for AuditsModule {
    fn default() -> Self {
        Self {
            config: RwLock::new(Config::default()),
            service: RwLock::new(None),
        }
    }
}

impl AuditsModule {
    /// Build fetchers, the optional reviewer and the domain service
    pub fn init(&self, cfg: Config, db: Arc<DatabaseConnection>) -> Result<()> {
        let fetcher = Arc::new(ReqwestFetcher::new(cfg.fetch_timeout, &cfg.user_agent)?);
        let renderer = Arc::new(HttpRenderer::new(
            cfg.renderer.url.clone(),
            cfg.renderer.timeout,
            &cfg.user_agent,
        )?);
        if cfg.renderer.url.is_none() {
            tracing::warn!("No rendering service configured, RENDERED passes will fall back to RAW");
        }

        let reviewer: Option<Arc<dyn AiReviewer>> = if cfg.ai.enabled {
            let client = OllamaClient::new(&cfg.ai)?;
            tracing::info!(host = %cfg.ai.host, model = client.model(), "AI reviewer enabled");
            Some(Arc::new(OllamaReviewer::new(client)))
        } else {
            tracing::info!("AI reviewer disabled");
            None
        };

        let auditor = Arc::new(Auditor::new(
            fetcher,
            renderer,
            reviewer,
            cfg.ai.html_snippet_chars,
        ));
        let repo = Arc::new(SeaOrmAuditRepository::new(db));
        let service = Arc::new(Service::new(repo, auditor));

        *self.service.write() = Some(service);
        *self.config.write() = cfg;

        tracing::info!("Audits module initialized");
        Ok(())
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self, db: &DatabaseConnection) -> Result<()> {
        Migrator::up(db, None).await?;
        tracing::info!("Audits migrations completed");
        Ok(())
    }

    fn service(&self) -> Result<Arc<Service>> {
        self.service
            .read()
            .as_ref()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))
    }

    /// Mount the audit and statistics routes
    pub fn register_rest(&self, router: axum::Router) -> Result<axum::Router> {
        let service = self.service()?;
        tracing::info!("Registering audits REST routes");
        Ok(crate::api::rest::register_routes(router, service))
    }

    /// In-process client
    pub fn client(&self) -> Result<Arc<dyn AuditsApi>> {
        Ok(Arc::new(crate::api::native::NativeClient::new(self.service()?)))
    }
}
