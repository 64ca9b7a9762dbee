//! Domain layer for the Inspekt session lifecycle subsystem.
//!
//! This crate owns the session state machine, the concurrency-safe store
//! holding session records, and the contracts the surrounding service layers
//! build on: the injectable [`clock::Clock`], the lifecycle event shape, the
//! persistence mirror trait, and the shared error type.

pub mod clock;
pub mod config;
pub mod error;
pub mod session;

// Re-export common error type
pub use error::{InspektError, Result};
