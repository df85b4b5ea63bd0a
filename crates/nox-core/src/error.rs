//! Error types for the Nox application workflow.

use serde::Serialize;
use thiserror::Error;

/// A shared error type for the entire Nox workflow.
///
/// Every variant is recoverable at the workflow level: a failing applicant or
/// staff command never takes the process (or other applicants' sessions) down.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NoxError {
    /// The applicant already has an application in progress.
    #[error("Applicant '{applicant_id}' already has an active application")]
    AlreadyActive { applicant_id: String },

    /// A review surface already exists for the applicant.
    #[error("A review surface '{surface_name}' already exists")]
    AlreadyHasReviewSurface { surface_name: String },

    /// The applicant cannot receive direct messages.
    #[error("Applicant '{applicant_id}' cannot be reached by direct message")]
    Unreachable { applicant_id: String },

    /// The platform refused an operation for lack of permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Creating or posting to a review surface failed.
    #[error("Provisioning error: {0}")]
    Provision(String),

    /// The invoking member may not run staff commands.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The command was invoked outside an application review surface.
    #[error("Wrong context: {0}")]
    WrongContext(String),

    /// A delete-time argument could not be parsed.
    #[error("Invalid time format '{input}'. Use formats like '10m', '1h' or '24'")]
    InvalidTimeSpec { input: String },

    /// A whole-form submission contained an unusable answer.
    #[error("Invalid answer for question {}: {reason}", .question + 1)]
    InvalidSubmission { question: usize, reason: String },

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NoxError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn already_active(applicant_id: impl Into<String>) -> Self {
        Self::AlreadyActive {
            applicant_id: applicant_id.into(),
        }
    }

    pub fn already_has_review_surface(surface_name: impl Into<String>) -> Self {
        Self::AlreadyHasReviewSurface {
            surface_name: surface_name.into(),
        }
    }

    pub fn unreachable(applicant_id: impl Into<String>) -> Self {
        Self::Unreachable {
            applicant_id: applicant_id.into(),
        }
    }

    pub fn invalid_time_spec(input: impl Into<String>) -> Self {
        Self::InvalidTimeSpec {
            input: input.into(),
        }
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// True for the two ways a new application attempt can collide with an existing one.
    pub fn is_session_conflict(&self) -> bool {
        matches!(
            self,
            Self::AlreadyActive { .. } | Self::AlreadyHasReviewSurface { .. }
        )
    }

    pub fn is_delivery_failure(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }

    pub fn is_provision_failure(&self) -> bool {
        matches!(self, Self::Forbidden(_) | Self::Provision(_))
    }

    /// True for every rejection a staff command can hit before any side effect.
    pub fn is_command_rejection(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_) | Self::WrongContext(_) | Self::InvalidTimeSpec { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Conversion from String (for error messages)
impl From<String> for NoxError {
    fn from(err: String) -> Self {
        Self::Internal(err)
    }
}

/// A type alias for `Result<T, NoxError>`.
pub type Result<T> = std::result::Result<T, NoxError>;
