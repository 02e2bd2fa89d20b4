//! Domain Ports (Interfaces)
//!
//! These traits define the boundaries of the domain layer.
//! Infrastructure layer provides concrete implementations.

pub mod engine;
pub mod file_system;

pub use engine::{EngineBuildRequest, EngineBuilder, EngineError, PolicyEngine, PolicySource};
pub use file_system::{FileSystem, FsError, FsResult};
