//! Concurrency-safe session store.
//!
//! `SessionStore` exclusively owns the id-to-record map; every mutation goes
//! through it. A single `RwLock` over the whole map is the concurrency unit:
//! session counts are thousands at most, so a full-map write guard bounds a
//! sweep well below request-latency concerns, and it makes check-then-write
//! sequences trivially atomic. Expired records are treated as absent by every
//! read path regardless of whether a sweep has physically collected them yet.

use super::model::SessionRecord;
use crate::error::{InspektError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// The single owner of live session records.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl SessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateId` if the id is already live. Generated UUIDs make
    /// this unreachable in practice, but replayed or rehydrated ids must not
    /// silently overwrite a live session.
    pub async fn insert(&self, record: SessionRecord) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&record.id) {
            return Err(InspektError::duplicate_id(record.id));
        }
        sessions.insert(record.id.clone(), record);
        Ok(())
    }

    /// Returns the record if present and not expired at `now`.
    ///
    /// # Errors
    ///
    /// `NotFound` for absent and expired ids alike; callers cannot tell the
    /// two apart.
    pub async fn get(&self, id: &str, now: DateTime<Utc>) -> Result<SessionRecord> {
        let sessions = self.sessions.read().await;
        match sessions.get(id) {
            Some(record) if !record.is_expired(now) => Ok(record.clone()),
            _ => Err(InspektError::not_found("session", id)),
        }
    }

    /// Atomically re-checks liveness at `now`, applies `mutator`, and commits.
    ///
    /// The mutator runs against a draft; if it fails, the stored record is
    /// left untouched (transitions are all-or-nothing). The write guard held
    /// across check, mutate, and commit is what makes this linearizable with
    /// respect to `remove` and `sweep` on the same id.
    pub async fn update<F>(&self, id: &str, now: DateTime<Utc>, mutator: F) -> Result<SessionRecord>
    where
        F: FnOnce(&mut SessionRecord) -> Result<()>,
    {
        let mut sessions = self.sessions.write().await;
        let record = sessions
            .get_mut(id)
            .filter(|record| !record.is_expired(now))
            .ok_or_else(|| InspektError::not_found("session", id))?;

        let mut draft = record.clone();
        mutator(&mut draft)?;
        *record = draft;
        Ok(record.clone())
    }

    /// Removes a record unconditionally. Idempotent; returns whether a
    /// record was actually present.
    pub async fn remove(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id).is_some()
    }

    /// Deletes every record with `expires_at < now`, returning their ids.
    ///
    /// An immediate second sweep at the same `now` finds nothing.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, record)| record.expires_at < now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            sessions.remove(id);
        }
        expired
    }

    /// Snapshot of all records live at `now`.
    pub async fn list(&self, now: DateTime<Utc>) -> Vec<SessionRecord> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|record| !record.is_expired(now))
            .cloned()
            .collect()
    }

    /// Bulk-loads rehydrated records, dropping any already expired at `now`
    /// and any whose id is already live. Returns how many were loaded.
    pub async fn restore(
        &self,
        records: impl IntoIterator<Item = SessionRecord>,
        now: DateTime<Utc>,
    ) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut loaded = 0;
        for record in records {
            if record.is_expired(now) || sessions.contains_key(&record.id) {
                continue;
            }
            sessions.insert(record.id.clone(), record);
            loaded += 1;
        }
        loaded
    }

    /// Number of physically held records, expired-but-unswept included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
