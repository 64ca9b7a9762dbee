//! TOML-file-per-session repository.
//!
//! Directory structure:
//! ```text
//! base_dir/
//! ├── 0b8c6b8e-....toml
//! └── 4f1a02d7-....toml
//! ```
//!
//! Saves are atomic: serialize, write to a dot-prefixed temp file, fsync,
//! rename. A per-record advisory lock (`fs2`) serializes concurrent saves of
//! the same id across processes; the lock and the blocking write both run on
//! tokio's blocking pool so a slow disk never stalls an async worker. Records
//! that fail to parse during a directory scan are skipped with a warning
//! rather than failing the whole listing.

use async_trait::async_trait;
use fs2::FileExt;
use inspekt_core::error::{InspektError, Result};
use inspekt_core::session::{SessionRecord, SessionRepository};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

/// File-system backed session persistence.
pub struct TomlSessionRepository {
    base_dir: PathBuf,
}

impl TomlSessionRepository {
    /// Creates the repository, creating `base_dir` if needed.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir })
    }

    /// Session ids are facade-generated UUIDs; anything that could escape
    /// the base directory is treated as absent.
    fn safe_id(id: &str) -> bool {
        !id.is_empty()
            && !id.contains(['/', '\\'])
            && !id.contains("..")
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.base_dir.join(format!("{id}.toml"))
    }

    fn write_atomic(path: &Path, contents: &str) -> Result<()> {
        let parent = path.parent().ok_or_else(|| {
            InspektError::io(format!("path has no parent directory: {}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .ok_or_else(|| InspektError::io(format!("path has no file name: {}", path.display())))?
            .to_string_lossy();

        // Advisory lock keeps two writers of the same record from racing the
        // rename; the lock file outlives the temp file on purpose.
        let lock_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        lock_file
            .lock_exclusive()
            .map_err(|err| InspektError::io(format!("failed to acquire lock: {err}")))?;

        let tmp_path = parent.join(format!(".{file_name}.tmp"));
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(contents.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, path)?;

        drop(lock_file);
        let _ = fs::remove_file(&lock_path);
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for TomlSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        if !Self::safe_id(session_id) {
            return Ok(None);
        }
        match tokio::fs::read_to_string(self.record_path(session_id)).await {
            Ok(content) => {
                let record: SessionRecord = toml::from_str(&content)?;
                Ok(Some(record))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, record: &SessionRecord) -> Result<()> {
        if !Self::safe_id(&record.id) {
            return Err(InspektError::validation(format!(
                "session id '{}' is not a safe file name",
                record.id
            )));
        }
        let content = toml::to_string_pretty(record)?;
        let path = self.record_path(&record.id);
        // fsync and the advisory lock are blocking syscalls; keep them off
        // the async workers.
        tokio::task::spawn_blocking(move || Self::write_atomic(&path, &content))
            .await
            .map_err(|err| InspektError::internal(format!("save task failed: {err}")))?
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        if !Self::safe_id(session_id) {
            return Ok(());
        }
        match tokio::fs::remove_file(self.record_path(session_id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn list_all(&self) -> Result<Vec<SessionRecord>> {
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }
            // Skip in-progress temp files.
            if path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with('.'))
            {
                continue;
            }
            let content = tokio::fs::read_to_string(&path).await?;
            match toml::from_str::<SessionRecord>(&content) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(
                        "[TomlSessionRepository] Skipping unparsable record {}: {}",
                        path.display(),
                        err
                    );
                }
            }
        }
        Ok(records)
    }
}
