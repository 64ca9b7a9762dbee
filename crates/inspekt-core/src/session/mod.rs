//! Session domain module.
//!
//! This module contains the session record model, the transition policy, the
//! concurrency-safe store, the lifecycle event contract, and the persistence
//! mirror trait.
//!
//! # Module Structure
//!
//! - `model`: Core session domain model (`SessionRecord`, `SessionState`, `Stage`)
//! - `policy`: Legal state transitions (`check_transition`)
//! - `store`: Concurrency-safe keyed collection (`SessionStore`)
//! - `event`: Observability event shape (`LifecycleEvent`, `EventSink`)
//! - `repository`: Repository trait for optional session persistence

mod event;
mod model;
mod policy;
mod repository;
mod store;

// Re-export public API
pub use event::{EventOutcome, EventSink, LifecycleEvent, TracingSink};
pub use model::{SessionRecord, SessionState, Stage, TransitionTo};
pub use policy::{check_transition, is_terminal, transition_allowed};
pub use repository::SessionRepository;
pub use store::SessionStore;
