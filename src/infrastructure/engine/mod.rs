//! Decision engine builders

mod static_ref;

pub use static_ref::{StaticRefEngine, StaticRefEngineBuilder, MAX_REFERENCE_DEPTH};
