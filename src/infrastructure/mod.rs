//! Infrastructure Layer
//!
//! Concrete implementations of domain ports.
//! This layer handles all I/O operations.
//!
//! ## Structure
//!
//! - `fs/` - Local file system implementation
//! - `repositories/` - Per-domain persisted state (properties, engine configuration, policies)
//! - `engine/` - Reference decision engine builder

pub mod engine;
pub mod fs;
pub mod repositories;

// Re-export for convenience
pub use engine::StaticRefEngineBuilder;
pub use fs::LocalFs;
pub use repositories::{PolicyVersionStore, TomlPdpConfigRepository, TomlPropertiesRepository};
