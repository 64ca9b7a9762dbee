//! Application layer for the Inspekt session lifecycle subsystem.
//!
//! [`lifecycle::SessionLifecycle`] is the facade external collaborators (the
//! HTTP layer, the analyzer pipeline) call; [`scheduler::ExpiryScheduler`]
//! is the background reclamation loop tied to process lifecycle.

pub mod lifecycle;
pub mod scheduler;

pub use lifecycle::SessionLifecycle;
pub use scheduler::ExpiryScheduler;
