//! Infrastructure layer for NOX: configuration loading, logging setup and an
//! in-memory implementation of the platform collaborator traits.

pub mod config_loader;
pub mod logging;
pub mod memory_platform;

pub use memory_platform::{InMemoryPlatform, SurfaceSnapshot};
