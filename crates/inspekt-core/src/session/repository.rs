//! Session repository trait.
//!
//! Sessions are in-memory first; this trait is the optional persistence
//! mirror that lets them survive a process restart. Implementations live in
//! the infrastructure layer.

use super::model::SessionRecord;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract store for persisted session records, keyed by session id.
///
/// Implementations must persist the full record field set, timestamps at
/// millisecond precision included, or rehydrated records would expire at a
/// different instant than their live counterparts did.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds a persisted record by its id.
    ///
    /// Returns `Ok(None)` when no record exists for the id.
    async fn find_by_id(&self, session_id: &str) -> Result<Option<SessionRecord>>;

    /// Saves a record, replacing any previous version.
    async fn save(&self, record: &SessionRecord) -> Result<()>;

    /// Deletes a persisted record. Idempotent; deleting an absent id is not
    /// an error.
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Lists every persisted record, expired ones included; the caller
    /// decides what is still live.
    async fn list_all(&self) -> Result<Vec<SessionRecord>>;
}
