//! Legal state transitions.
//!
//! One table, consulted everywhere a state change is requested:
//!
//! ```text
//! Created   -> Uploaded | Error
//! Uploaded  -> Analyzing | Error
//! Analyzing -> Completed | Error
//! Completed -> (terminal)
//! Error     -> (terminal)
//! ```
//!
//! Terminal states reject every target, including re-entry into the same
//! state, so a pipeline stage retrying against a finished session gets a
//! diagnosable error instead of a silent no-op.

use super::model::Stage;
use crate::error::{InspektError, Result};

/// Whether the policy table permits `from -> to`.
pub fn transition_allowed(from: Stage, to: Stage) -> bool {
    use Stage::*;
    matches!(
        (from, to),
        (Created, Uploaded)
            | (Created, Error)
            | (Uploaded, Analyzing)
            | (Uploaded, Error)
            | (Analyzing, Completed)
            | (Analyzing, Error)
    )
}

/// Checks the table, failing with the attempted pair.
pub fn check_transition(from: Stage, to: Stage) -> Result<()> {
    if transition_allowed(from, to) {
        Ok(())
    } else {
        Err(InspektError::invalid_transition(from, to))
    }
}

/// Whether `stage` has no outgoing transitions.
pub fn is_terminal(stage: Stage) -> bool {
    matches!(stage, Stage::Completed | Stage::Error)
}
