// Error taxonomy for the composition model
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// A referenced tile or filter id is absent from the working copy
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    DuplicateId { kind: &'static str, id: String },

    /// Malformed geometry, filter target or name; rejected before mutation
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("cannot {action} while {mode}")]
    InvalidTransition {
        action: &'static str,
        mode: &'static str,
    },

    /// Save/fetch transport or server-side failure, surfaced verbatim
    #[error("{0}")]
    Persistence(String),
}

impl DashboardError {
    pub fn tile_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "tile",
            id: id.into(),
        }
    }

    pub fn filter_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "filter",
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn persistence(err: anyhow::Error) -> Self {
        Self::Persistence(format!("{err:#}"))
    }

    /// Persistence failures can be retried by the user; model errors cannot
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}
