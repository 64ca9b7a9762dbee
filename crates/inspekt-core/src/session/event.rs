//! Lifecycle observability events.
//!
//! Every create, every transition (accepted or rejected), and every sweep
//! emits one event with a fixed shape. This module defines the shape and the
//! sink seam; where the events go is the logging collaborator's business.

use super::model::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether the requested operation was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    Accepted,
    Rejected,
}

/// A structured lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A state change was requested (creation counts, with `from` absent).
    Transition {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Stage>,
        to: Stage,
        outcome: EventOutcome,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
    },
    /// A reclamation pass finished.
    Sweep {
        evicted: usize,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
    },
}

/// Destination for lifecycle events.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &LifecycleEvent);
}

/// Default sink: structured `tracing` output under the `session_lifecycle`
/// target.
#[derive(Debug, Default, Clone)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Transition {
                session_id,
                from,
                to,
                outcome,
                ..
            } => match from {
                Some(from) => tracing::info!(
                    target: "session_lifecycle",
                    "Transition {} -> {} for session {} ({:?})",
                    from,
                    to,
                    session_id,
                    outcome
                ),
                None => tracing::info!(
                    target: "session_lifecycle",
                    "Created session {} ({:?})",
                    session_id,
                    outcome
                ),
            },
            LifecycleEvent::Sweep { evicted, .. } => {
                tracing::info!(target: "session_lifecycle", "Sweep evicted {} session(s)", evicted);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_events_serialize_with_optional_from() {
        let event = LifecycleEvent::Transition {
            session_id: "s-1".to_string(),
            from: None,
            to: Stage::Created,
            outcome: EventOutcome::Accepted,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "transition");
        assert_eq!(json["to"], "created");
        assert_eq!(json["outcome"], "accepted");
        assert!(json.get("from").is_none());

        let back: LifecycleEvent = serde_json::from_value(json).unwrap();
        match back {
            LifecycleEvent::Transition { from, to, .. } => {
                assert_eq!(from, None);
                assert_eq!(to, Stage::Created);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn sweep_events_carry_the_eviction_count() {
        let event = LifecycleEvent::Sweep {
            evicted: 3,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "sweep");
        assert_eq!(json["evicted"], 3);
    }
}
