//! Route registration

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, MethodRouter},
    Extension, Router,
};

use super::handlers;
use crate::domain::Service;

/// Register a path with and without its trailing slash
fn route_both(router: Router, path: &str, method: MethodRouter) -> Router {
    let bare = path.trim_end_matches('/');
    router
        .route(bare, method.clone())
        .route(&format!("{bare}/"), method)
}

/// Register all REST routes
pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    let routes = [
        // Audit endpoints
        ("/api/audit", post(handlers::create_audit)),
        ("/api/audits", get(handlers::list_audits)),
        (
            "/api/audits/{id}",
            get(handlers::get_audit).delete(handlers::delete_audit),
        ),
        ("/api/audits/{id}/delete", delete(handlers::delete_audit)),
        ("/api/audits/{id}/statistics", get(handlers::audit_statistics)),
        ("/api/criteria", get(handlers::list_criteria)),
        ("/api/export/csv", get(handlers::export_csv)),
        // Statistics endpoints
        ("/api/statistics/global", get(handlers::global_statistics)),
        ("/api/statistics/verdicts", get(handlers::verdict_distribution)),
        ("/api/statistics/criteria", get(handlers::criteria_statistics)),
        ("/api/statistics/levels", get(handlers::level_statistics)),
        ("/api/statistics/principles", get(handlers::principle_statistics)),
        ("/api/statistics/timeline", get(handlers::timeline)),
        ("/api/statistics/ranking", get(handlers::ranking)),
        ("/api/statistics/sources", get(handlers::source_comparison)),
        ("/api/statistics/audit/{id}", get(handlers::audit_detail_statistics)),
        ("/api/statistics/report", get(handlers::report)),
        (
            "/api/statistics/accessibility-levels",
            get(handlers::accessibility_levels),
        ),
        (
            "/api/statistics/accessibility-by-wcag",
            get(handlers::accessibility_by_wcag_level),
        ),
        ("/health", get(handlers::health)),
    ];

    routes
        .into_iter()
        .fold(router, |router, (path, method)| route_both(router, path, method))
        .layer(Extension(service))
}
