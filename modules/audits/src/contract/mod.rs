//! Contract layer - public API for inter-module communication
//!
//! This layer contains transport-agnostic models and the native client trait.

pub mod client;
pub mod error;
pub mod model;

pub use client::AuditsApi;
pub use error::AuditError;
pub use model::{
    Audit, AuditRequest, AuditSummary, CheckMode, CriterionInfo, CriterionResult, EffectiveMode,
    Level, NewAudit, Principle, Source, Verdict, VerdictCounts,
};
