//! Common test utilities for the integration tests.
//!
//! This module provides:
//! - `TestRepo`: a registry over an isolated domains root and template
//! - Fixtures: policy documents and out-of-band filesystem edits

#![allow(dead_code)]

pub mod fixtures;
pub mod repo;

pub use fixtures::*;
pub use repo::*;
