//! Contract error types for the audits module
//!
//! These errors are transport-agnostic and used for inter-module communication.

/// Audits module domain errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// Audit not found
    NotFound {
        /// Resource type (audit)
        resource: String,
        /// Resource identifier
        id: String,
    },
    /// Invalid request
    Validation {
        /// Validation error message
        message: String,
    },
    /// The target page could not be fetched or parsed
    Fetch {
        /// Target URL
        url: String,
        /// Error details
        details: String,
    },
    /// Storage unavailable while saving
    Unavailable {
        /// Error details
        details: String,
    },
    /// Internal error
    Internal,
}

impl AuditError {
    pub fn not_found(id: i64) -> Self {
        Self::NotFound {
            resource: "audit".to_string(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for AuditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { resource, id } => {
                write!(f, "{} not found: {}", resource, id)
            }
            Self::Validation { message } => {
                write!(f, "Validation error: {}", message)
            }
            Self::Fetch { url, details } => {
                write!(f, "Could not audit '{}': {}", url, details)
            }
            Self::Unavailable { details } => {
                write!(f, "Storage unavailable: {}", details)
            }
            Self::Internal => {
                write!(f, "Internal error")
            }
        }
    }
}

impl std::error::Error for AuditError {}
