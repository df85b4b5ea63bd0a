//! Domain layer for NOX guild application intake.
//!
//! Holds the questionnaire state machine, its answer validation, the session
//! registry and the interfaces the workflow needs from the chat platform.

pub mod application;
pub mod config;
pub mod decision;
pub mod error;
pub mod identity;
pub mod platform;
pub mod questionnaire;
pub mod registry;
pub mod review;
pub mod sanitizer;
pub mod timespec;

// Re-export common types
pub use error::{NoxError, Result};
pub use identity::{Applicant, MemberId, ServerId, SurfaceId};
pub use registry::SessionRegistry;
