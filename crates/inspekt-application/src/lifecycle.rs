//! Session lifecycle facade.
//!
//! `SessionLifecycle` is the only entry point external collaborators use: the
//! HTTP layer creates sessions here after an upload, each analyzer pipeline
//! stage advances them here, and the expiry scheduler sweeps through here.
//! It composes the store, the transition policy, the clock, the event sink,
//! and the optional persistence mirror. All collaborators are explicitly
//! owned, so tests can run any number of independent instances.

use inspekt_core::clock::{Clock, SystemClock};
use inspekt_core::config::LifecycleConfig;
use inspekt_core::error::{InspektError, Result};
use inspekt_core::session::{
    check_transition, EventOutcome, EventSink, LifecycleEvent, SessionRecord, SessionRepository,
    SessionStore, Stage, TracingSink, TransitionTo,
};
use std::sync::Arc;
use uuid::Uuid;

/// Facade over the session store, transition policy, and clock.
///
/// The in-memory store is authoritative; the repository, when configured,
/// mirrors it best-effort so sessions can be rehydrated after a restart.
pub struct SessionLifecycle {
    /// The single owner of live session records
    store: Arc<SessionStore>,
    /// Time source for TTL computation and expiry checks
    clock: Arc<dyn Clock>,
    /// TTL and allow-list configuration, fixed at construction
    config: LifecycleConfig,
    /// Destination for structured lifecycle events
    sink: Arc<dyn EventSink>,
    /// Optional persistence mirror
    repository: Option<Arc<dyn SessionRepository>>,
}

impl std::fmt::Debug for SessionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLifecycle")
            .field("config", &self.config)
            .field("has_repository", &self.repository.is_some())
            .finish_non_exhaustive()
    }
}

impl SessionLifecycle {
    /// Creates a facade with the wall clock, tracing event sink, and no
    /// persistence mirror.
    ///
    /// # Errors
    ///
    /// `Config` if the configuration fails [`LifecycleConfig::validate`]; a
    /// zero sweep interval must never reach the scheduler, whose timer
    /// panics on a zero period.
    pub fn new(config: LifecycleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: Arc::new(SessionStore::new()),
            clock: Arc::new(SystemClock),
            config,
            sink: Arc::new(TracingSink),
            repository: None,
        })
    }

    /// Replaces the time source (deterministic clocks in tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the event sink.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Attaches a persistence mirror.
    pub fn with_repository(mut self, repository: Arc<dyn SessionRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Creates a session with the configured default TTL.
    pub async fn create(&self, file_name: &str, language: &str) -> Result<SessionRecord> {
        self.create_with_ttl(file_name, language, self.config.ttl())
            .await
    }

    /// Creates a session expiring `ttl` after now.
    ///
    /// # Errors
    ///
    /// `Validation` for blank inputs, a non-positive TTL, or a language
    /// outside the configured allow-list; `DuplicateId` on the (practically
    /// unreachable) UUID collision.
    pub async fn create_with_ttl(
        &self,
        file_name: &str,
        language: &str,
        ttl: chrono::Duration,
    ) -> Result<SessionRecord> {
        if !language.trim().is_empty() && !self.config.language_allowed(language) {
            return Err(InspektError::validation(format!(
                "language '{}' is not in the configured allow-list",
                language
            )));
        }

        let now = self.clock.now();
        let record =
            SessionRecord::new(Uuid::new_v4().to_string(), file_name, language, ttl, now)?;

        self.store.insert(record.clone()).await?;
        self.mirror_save(&record).await;
        self.sink.record(&LifecycleEvent::Transition {
            session_id: record.id.clone(),
            from: None,
            to: Stage::Created,
            outcome: EventOutcome::Accepted,
            timestamp: now,
        });
        tracing::info!(
            "[SessionLifecycle] Created session {} for {} ({}), expires {}",
            record.id,
            record.file_name,
            record.language,
            record.expires_at
        );

        Ok(record)
    }

    /// Advances a session to the requested state.
    ///
    /// The policy check and the state replacement happen under one store
    /// guard, so concurrent conflicting transitions commit exactly once.
    ///
    /// # Errors
    ///
    /// `NotFound` for absent or expired ids (indistinguishable),
    /// `InvalidTransition` with the attempted pair for illegal requests; the
    /// record is untouched on failure.
    pub async fn transition(&self, id: &str, target: TransitionTo) -> Result<SessionRecord> {
        let now = self.clock.now();
        let to = target.stage();

        let mut from_stage: Option<Stage> = None;
        let result = self
            .store
            .update(id, now, |record| {
                from_stage = Some(record.stage());
                check_transition(record.stage(), to)?;
                record.state = target.into_state(&record.state);
                Ok(())
            })
            .await;

        match result {
            Ok(record) => {
                self.mirror_save(&record).await;
                self.sink.record(&LifecycleEvent::Transition {
                    session_id: record.id.clone(),
                    from: from_stage,
                    to,
                    outcome: EventOutcome::Accepted,
                    timestamp: now,
                });
                tracing::info!(
                    "[SessionLifecycle] Session {} transitioned to {}",
                    record.id,
                    to
                );
                Ok(record)
            }
            Err(err) => {
                self.sink.record(&LifecycleEvent::Transition {
                    session_id: id.to_string(),
                    from: from_stage,
                    to,
                    outcome: EventOutcome::Rejected,
                    timestamp: now,
                });
                tracing::warn!(
                    "[SessionLifecycle] Rejected transition of session {} to {}: {}",
                    id,
                    to,
                    err
                );
                Err(err)
            }
        }
    }

    /// Returns a session if it exists and has not expired.
    ///
    /// # Errors
    ///
    /// `NotFound`; expired sessions are absent here whether or not a sweep
    /// has collected them.
    pub async fn get(&self, id: &str) -> Result<SessionRecord> {
        self.store.get(id, self.clock.now()).await
    }

    /// Removes a session (explicit early termination). Idempotent.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let removed = self.store.remove(id).await;
        self.mirror_delete(id).await;
        if removed {
            tracing::info!("[SessionLifecycle] Deleted session {}", id);
        }
        Ok(())
    }

    /// Lists all live sessions.
    pub async fn list(&self) -> Vec<SessionRecord> {
        self.store.list(self.clock.now()).await
    }

    /// Rehydrates sessions from the persistence mirror, dropping any already
    /// past their expiry before they become visible. Returns how many were
    /// restored; a facade without a repository restores nothing.
    pub async fn restore(&self) -> Result<usize> {
        let Some(repository) = &self.repository else {
            return Ok(0);
        };
        let now = self.clock.now();

        let records = repository.list_all().await?;
        let mut live = Vec::new();
        for record in records {
            if record.is_expired(now) {
                if let Err(err) = repository.delete(&record.id).await {
                    tracing::warn!(
                        "[SessionLifecycle] Failed to drop expired session {}: {}",
                        record.id,
                        err
                    );
                }
            } else {
                live.push(record);
            }
        }

        let restored = self.store.restore(live, now).await;
        tracing::info!("[SessionLifecycle] Restored {} session(s)", restored);
        Ok(restored)
    }

    /// Runs one reclamation pass: evicts every expired session, mirrors the
    /// deletions, and emits a sweep event. Returns the eviction count.
    pub async fn sweep(&self) -> Result<usize> {
        let now = self.clock.now();
        let evicted = self.store.sweep(now).await;

        for id in &evicted {
            self.mirror_delete(id).await;
        }

        self.sink.record(&LifecycleEvent::Sweep {
            evicted: evicted.len(),
            timestamp: now,
        });
        if !evicted.is_empty() {
            tracing::info!(
                "[SessionLifecycle] Swept {} expired session(s)",
                evicted.len()
            );
        }
        Ok(evicted.len())
    }

    /// The configured sweep period, for wiring up the scheduler.
    pub fn cleanup_interval(&self) -> std::time::Duration {
        self.config.cleanup_interval()
    }

    async fn mirror_save(&self, record: &SessionRecord) {
        if let Some(repository) = &self.repository {
            if let Err(err) = repository.save(record).await {
                tracing::warn!(
                    "[SessionLifecycle] Failed to mirror session {}: {}",
                    record.id,
                    err
                );
            }
        }
    }

    async fn mirror_delete(&self, id: &str) {
        if let Some(repository) = &self.repository {
            if let Err(err) = repository.delete(id).await {
                tracing::warn!(
                    "[SessionLifecycle] Failed to remove persisted session {}: {}",
                    id,
                    err
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use inspekt_core::clock::ManualClock;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockSessionRepository {
        records: Mutex<HashMap<String, SessionRecord>>,
    }

    impl MockSessionRepository {
        fn new() -> Self {
            Self {
                records: Mutex::new(HashMap::new()),
            }
        }

        fn contains(&self, id: &str) -> bool {
            self.records.lock().unwrap().contains_key(id)
        }
    }

    #[async_trait]
    impl SessionRepository for MockSessionRepository {
        async fn find_by_id(&self, session_id: &str) -> Result<Option<SessionRecord>> {
            Ok(self.records.lock().unwrap().get(session_id).cloned())
        }

        async fn save(&self, record: &SessionRecord) -> Result<()> {
            self.records
                .lock()
                .unwrap()
                .insert(record.id.clone(), record.clone());
            Ok(())
        }

        async fn delete(&self, session_id: &str) -> Result<()> {
            self.records.lock().unwrap().remove(session_id);
            Ok(())
        }

        async fn list_all(&self) -> Result<Vec<SessionRecord>> {
            Ok(self.records.lock().unwrap().values().cloned().collect())
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        events: Mutex<Vec<LifecycleEvent>>,
    }

    impl CollectingSink {
        fn events(&self) -> Vec<LifecycleEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl EventSink for CollectingSink {
        fn record(&self, event: &LifecycleEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn lifecycle_at(clock: Arc<ManualClock>) -> SessionLifecycle {
        SessionLifecycle::new(LifecycleConfig::default())
            .unwrap()
            .with_clock(clock)
    }

    #[test]
    fn construction_rejects_a_zero_sweep_interval() {
        let config = LifecycleConfig {
            session_cleanup_interval_hours: 0,
            ..Default::default()
        };
        // Caught here; the scheduler's timer panics on a zero period.
        let err = SessionLifecycle::new(config).unwrap_err();
        assert!(matches!(err, InspektError::Config(_)));

        let config = LifecycleConfig {
            session_timeout_hours: 0,
            ..Default::default()
        };
        assert!(SessionLifecycle::new(config).is_err());
    }

    #[tokio::test]
    async fn create_applies_the_default_ttl_exactly() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let lifecycle = lifecycle_at(clock);

        let record = lifecycle.create("main.py", "python").await.unwrap();
        assert_eq!(record.stage(), Stage::Created);
        assert_eq!(record.created_at, start);
        assert_eq!(record.expires_at, start + Duration::hours(24));

        let other = lifecycle.create("lib.rs", "rust").await.unwrap();
        assert_ne!(record.id, other.id);
    }

    #[tokio::test]
    async fn create_rejects_blank_inputs() {
        let lifecycle = SessionLifecycle::new(LifecycleConfig::default()).unwrap();
        assert!(lifecycle.create("", "go").await.unwrap_err().is_validation());
        assert!(lifecycle.create("a.go", "").await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn create_enforces_the_language_allow_list() {
        let config = LifecycleConfig {
            allowed_languages: vec!["python".to_string()],
            ..Default::default()
        };
        let lifecycle = SessionLifecycle::new(config).unwrap();
        assert!(lifecycle.create("main.py", "python").await.is_ok());
        assert!(
            lifecycle
                .create("main.bf", "brainfuck")
                .await
                .unwrap_err()
                .is_validation()
        );
    }

    #[tokio::test]
    async fn expired_sessions_are_absent_without_a_sweep() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let lifecycle = lifecycle_at(Arc::clone(&clock));

        let record = lifecycle.create("main.py", "python").await.unwrap();

        clock.set(record.expires_at - Duration::milliseconds(1));
        assert!(lifecycle.get(&record.id).await.is_ok());

        clock.set(record.expires_at + Duration::milliseconds(1));
        let err = lifecycle.get(&record.id).await.unwrap_err();
        assert!(err.is_not_found());

        // Expired records also refuse transitions, as NotFound not as a
        // transition error.
        let err = lifecycle
            .transition(
                &record.id,
                TransitionTo::Uploaded {
                    file_path: "/tmp/x".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn transition_on_unknown_id_is_not_found() {
        let lifecycle = SessionLifecycle::new(LifecycleConfig::default()).unwrap();
        let err = lifecycle
            .transition("missing", TransitionTo::Analyzing)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let lifecycle = SessionLifecycle::new(LifecycleConfig::default()).unwrap();
        let record = lifecycle.create("main.py", "python").await.unwrap();
        lifecycle.delete(&record.id).await.unwrap();
        lifecycle.delete(&record.id).await.unwrap();
        assert!(lifecycle.get(&record.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn every_operation_emits_a_structured_event() {
        let sink = Arc::new(CollectingSink::default());
        let lifecycle = SessionLifecycle::new(LifecycleConfig::default())
            .unwrap()
            .with_event_sink(Arc::clone(&sink) as Arc<dyn EventSink>);

        let record = lifecycle.create("main.py", "python").await.unwrap();
        lifecycle
            .transition(
                &record.id,
                TransitionTo::Uploaded {
                    file_path: "/tmp/x".to_string(),
                },
            )
            .await
            .unwrap();
        // Illegal: Uploaded -> Completed
        let _ = lifecycle
            .transition(
                &record.id,
                TransitionTo::Completed {
                    analysis_result: json!({}),
                },
            )
            .await
            .unwrap_err();
        lifecycle.sweep().await.unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 4);
        assert!(matches!(
            &events[0],
            LifecycleEvent::Transition {
                from: None,
                to: Stage::Created,
                outcome: EventOutcome::Accepted,
                ..
            }
        ));
        assert!(matches!(
            &events[1],
            LifecycleEvent::Transition {
                from: Some(Stage::Created),
                to: Stage::Uploaded,
                outcome: EventOutcome::Accepted,
                ..
            }
        ));
        assert!(matches!(
            &events[2],
            LifecycleEvent::Transition {
                from: Some(Stage::Uploaded),
                to: Stage::Completed,
                outcome: EventOutcome::Rejected,
                ..
            }
        ));
        assert!(matches!(&events[3], LifecycleEvent::Sweep { evicted: 0, .. }));
    }

    #[tokio::test]
    async fn sweep_mirrors_evictions_to_the_repository() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let repository = Arc::new(MockSessionRepository::new());
        let lifecycle = SessionLifecycle::new(LifecycleConfig::default())
            .unwrap()
            .with_clock(Arc::clone(&clock) as Arc<dyn Clock>)
            .with_repository(Arc::clone(&repository) as Arc<dyn SessionRepository>);

        let record = lifecycle.create("main.py", "python").await.unwrap();
        assert!(repository.contains(&record.id));

        clock.advance(Duration::hours(25));
        assert_eq!(lifecycle.sweep().await.unwrap(), 1);
        assert!(!repository.contains(&record.id));
        assert_eq!(lifecycle.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn restore_rehydrates_only_live_sessions() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let repository = Arc::new(MockSessionRepository::new());

        let live = SessionRecord::new(
            "live".to_string(),
            "main.py",
            "python",
            Duration::hours(24),
            start,
        )
        .unwrap();
        let stale = SessionRecord::new(
            "stale".to_string(),
            "old.py",
            "python",
            Duration::hours(1),
            start - Duration::hours(2),
        )
        .unwrap();
        repository.save(&live).await.unwrap();
        repository.save(&stale).await.unwrap();

        let lifecycle = SessionLifecycle::new(LifecycleConfig::default())
            .unwrap()
            .with_clock(Arc::clone(&clock) as Arc<dyn Clock>)
            .with_repository(Arc::clone(&repository) as Arc<dyn SessionRepository>);

        assert_eq!(lifecycle.restore().await.unwrap(), 1);
        assert!(lifecycle.get("live").await.is_ok());
        assert!(lifecycle.get("stale").await.unwrap_err().is_not_found());
        // The expired record was also dropped from the mirror.
        assert!(!repository.contains("stale"));
    }

    #[tokio::test]
    async fn restore_without_a_repository_is_a_no_op() {
        let lifecycle = SessionLifecycle::new(LifecycleConfig::default()).unwrap();
        assert_eq!(lifecycle.restore().await.unwrap(), 0);
    }
}
