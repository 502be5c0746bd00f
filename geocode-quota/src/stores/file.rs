use std::{io::ErrorKind, path::PathBuf};

use crate::{stores::decode_record, Result, StateRecord, StateStore};

/// Default location of the state file, relative to the working directory.
pub const DEFAULT_STATE_PATH: &str = "./.geocoder-data";

/// Implements [`StateStore`] with a plain text file as the backend.
///
/// Deleting the file resets all state and forces the credential to be
/// acquired again.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    /// Path of the state file.
    pub path: PathBuf,
}

impl Default for FileStateStore {
    fn default() -> Self {
        Self { path: DEFAULT_STATE_PATH.into() }
    }
}

impl FileStateStore {
    /// Creates a store backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        name.into()
    }
}

#[async_trait::async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<StateRecord> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(decode_record(&String::from_utf8_lossy(&bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!(
                    "no state file at {}, starting fresh",
                    self.path.display()
                );
                Ok(StateRecord::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, record: &StateRecord) -> Result<()> {
        // replace the whole file so readers never see a partial record
        let temp = self.temp_path();
        tokio::fs::write(&temp, record.encode()).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        log::debug!("saved state to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn store_in(dir: &tempfile::TempDir) -> FileStateStore {
        FileStateStore::new(dir.path().join(".geocoder-data"))
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_record() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store_in(&dir);
        assert_eq!(store.load().await?, StateRecord::default());
        assert!(!store.path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn save_then_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store_in(&dir);
        let record = StateRecord {
            credential: "key".into(),
            last_request_time: Some(
                Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap(),
            ),
            quota_exceeded: true,
            quota_reset_at: Some(
                Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            ),
        };
        store.save(&record).await?;
        assert_eq!(store.load().await?, record);
        assert!(!store.temp_path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn save_overwrites_instead_of_appending() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store_in(&dir);
        let mut record = StateRecord::with_credential("a-rather-long-credential");
        store.save(&record).await?;
        record.credential = "short".into();
        for _ in 0..5 {
            store.save(&record).await?;
        }
        let text = std::fs::read_to_string(&store.path)?;
        assert_eq!(text, record.encode());
        assert_eq!(text.lines().count(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn partial_file_loads_with_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store_in(&dir);
        std::fs::write(&store.path, "key-only\n")?;
        assert_eq!(store.load().await?, StateRecord::with_credential("key-only"));

        std::fs::write(&store.path, "key\nnot-a-time\ntrue")?;
        let record = store.load().await?;
        assert_eq!(record.credential, "key");
        assert_eq!(record.last_request_time, None);
        assert!(record.quota_exceeded);
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_path_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        // a directory cannot be read as a state file
        let store = FileStateStore::new(dir.path());
        assert!(store.load().await.is_err());

        let store = FileStateStore::new(dir.path().join("missing/state"));
        assert!(store.save(&StateRecord::default()).await.is_err());
        assert!(store.load().await?.credential.is_empty());
        Ok(())
    }

    #[test]
    fn default_path() {
        assert_eq!(
            FileStateStore::default().path,
            PathBuf::from("./.geocoder-data")
        );
    }
}
