//! Domain Layer
//!
//! Pure types and rules of the policy repository, without I/O.
//!
//! ## Structure
//!
//! - `entities/` - Persisted documents (domain properties, engine configuration, policies)
//! - `value_objects/` - Immutable value types (policy version, identifiers, features)
//! - `ports/` - Interface definitions for infrastructure (file system, decision engine)

pub mod entities;
pub mod ports;
pub mod value_objects;
