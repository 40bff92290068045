//! Local JSON file backend.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use super::{KeyedRecordStore, RecordMap, TabularRecord, index_records};
use crate::error::StoreResult;

/// One pretty-printed JSON object per cache: key to record.
pub struct LocalFileStore<R> {
    path: PathBuf,
    _record: PhantomData<fn() -> R>,
}

impl<R> LocalFileStore<R> {
    /// Store backed by `path`. Nothing is touched until load or save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), _record: PhantomData }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl<R: TabularRecord> KeyedRecordStore<R> for LocalFileStore<R> {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> StoreResult<RecordMap<R>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RecordMap::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(RecordMap::new());
        }

        let stored: BTreeMap<String, R> = serde_json::from_str(&text)?;
        Ok(index_records(stored.into_values()))
    }

    async fn save(&self, records: &RecordMap<R>) -> StoreResult<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        let ordered: BTreeMap<&String, &R> = records.iter().collect();
        let json = serde_json::to_string_pretty(&ordered)?;

        // Write beside the target, then rename over it.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), rows = records.len(), "Saved local cache");
        Ok(())
    }
}
