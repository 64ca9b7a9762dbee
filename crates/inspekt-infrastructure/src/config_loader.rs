//! Lifecycle configuration loading.

use inspekt_core::config::LifecycleConfig;
use inspekt_core::error::Result;
use std::path::Path;

/// Loads [`LifecycleConfig`] from a TOML file.
///
/// A missing or empty file yields the defaults; a present file may set any
/// subset of fields. The result is validated, so a non-positive timeout or
/// sweep interval fails here, at startup, rather than later in the core.
pub async fn load_config(path: impl AsRef<Path>) -> Result<LifecycleConfig> {
    let path = path.as_ref();
    let config = match tokio::fs::read_to_string(path).await {
        Ok(content) if !content.trim().is_empty() => toml::from_str(&content)?,
        Ok(_) => LifecycleConfig::default(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "[config] No config file at {}, using defaults",
                path.display()
            );
            LifecycleConfig::default()
        }
        Err(err) => return Err(err.into()),
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(dir.path().join("absent.toml")).await.unwrap();
        assert_eq!(config, LifecycleConfig::default());
    }

    #[tokio::test]
    async fn partial_file_overrides_some_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inspekt.toml");
        std::fs::write(
            &path,
            "session_timeout_hours = 48\nallowed_languages = [\"python\", \"go\"]\n",
        )
        .unwrap();

        let config = load_config(&path).await.unwrap();
        assert_eq!(config.session_timeout_hours, 48);
        assert_eq!(config.session_cleanup_interval_hours, 1);
        assert!(config.language_allowed("go"));
        assert!(!config.language_allowed("rust"));
    }

    #[tokio::test]
    async fn non_positive_hours_fail_at_load_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inspekt.toml");
        std::fs::write(&path, "session_timeout_hours = 0\n").unwrap();
        assert!(load_config(&path).await.is_err());
    }

    #[tokio::test]
    async fn malformed_toml_is_a_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inspekt.toml");
        std::fs::write(&path, "session_timeout_hours = [broken").unwrap();
        let err = load_config(&path).await.unwrap_err();
        assert!(matches!(
            err,
            inspekt_core::InspektError::Serialization { .. }
        ));
    }
}
