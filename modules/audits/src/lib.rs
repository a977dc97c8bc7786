//! Audits Module
//!
//! Heuristic WCAG 2.1 audits of public web pages: fetches a page, evaluates
//! each registered criterion against the static HTML, a rendered DOM or a
//! language-model review, stores the outcome and serves statistics over it.

// Public exports
pub mod contract;
pub use contract::{
    client::AuditsApi, error::AuditError, Audit, AuditRequest, AuditSummary, CheckMode,
    CriterionResult, Level, Principle, Source, Verdict,
};

pub mod module;
pub use module::AuditsModule;

pub mod config;
pub use config::Config;

pub mod ai;
pub mod engine;

// Internal modules (hidden from public API)
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
