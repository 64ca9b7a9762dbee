//! Lifecycle configuration consumed at process startup.

use crate::error::{InspektError, Result};
use serde::{Deserialize, Serialize};

fn default_session_timeout_hours() -> u32 {
    24
}

fn default_cleanup_interval_hours() -> u32 {
    1
}

/// Configuration for session TTL and background reclamation.
///
/// Loaded from the service config file; missing fields fall back to the
/// defaults above. A non-positive interval is a startup configuration error,
/// surfaced by [`LifecycleConfig::validate`] before anything is constructed
/// from it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LifecycleConfig {
    /// Hours a session stays accessible after creation
    #[serde(default = "default_session_timeout_hours")]
    pub session_timeout_hours: u32,
    /// Hours between background expiry sweeps
    #[serde(default = "default_cleanup_interval_hours")]
    pub session_cleanup_interval_hours: u32,
    /// Accepted artifact languages; empty means any non-blank language
    #[serde(default)]
    pub allowed_languages: Vec<String>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            session_timeout_hours: default_session_timeout_hours(),
            session_cleanup_interval_hours: default_cleanup_interval_hours(),
            allowed_languages: Vec::new(),
        }
    }
}

impl LifecycleConfig {
    /// Rejects configurations that would disable expiry or the sweeper.
    pub fn validate(&self) -> Result<()> {
        if self.session_timeout_hours == 0 {
            return Err(InspektError::config(
                "session_timeout_hours must be positive",
            ));
        }
        if self.session_cleanup_interval_hours == 0 {
            return Err(InspektError::config(
                "session_cleanup_interval_hours must be positive",
            ));
        }
        Ok(())
    }

    /// Session time-to-live.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.session_timeout_hours))
    }

    /// Period between expiry sweeps.
    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.session_cleanup_interval_hours) * 3600)
    }

    /// Whether `language` passes the configured allow-list.
    pub fn language_allowed(&self, language: &str) -> bool {
        self.allowed_languages.is_empty()
            || self.allowed_languages.iter().any(|l| l == language)
    }
}
