//! Domain layer - business logic and services

pub mod export;
pub mod repository;
pub mod service;
pub mod statistics;

pub use repository::AuditRepository;
pub use service::{validate_url, Service};
