///! In-process remote table
use async_trait::async_trait;
use kettou_common::RaceResultRow;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::error::CacheError;
use super::remote::RemoteTable;

/// Row table held in memory, with a switch to simulate an outage
#[derive(Debug, Default)]
pub struct MemoryTable {
    rows: Mutex<Vec<RaceResultRow>>,
    offline: AtomicBool,
    deleted: Mutex<Vec<usize>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<RaceResultRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// Make every call fail as if the backend were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<RaceResultRow> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Indices passed to `delete_row`, in call order
    pub fn deleted_indices(&self) -> Vec<usize> {
        self.deleted.lock().map(|d| d.clone()).unwrap_or_default()
    }

    fn check_online(&self) -> Result<(), CacheError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("memory table is offline".to_string()));
        }
        Ok(())
    }

    fn poisoned() -> CacheError {
        CacheError::Unavailable("memory table lock poisoned".to_string())
    }
}

#[async_trait]
impl RemoteTable for MemoryTable {
    async fn read_rows(&self) -> Result<Vec<RaceResultRow>, CacheError> {
        self.check_online()?;
        let rows = self.rows.lock().map_err(|_| Self::poisoned())?;
        Ok(rows.clone())
    }

    async fn append_rows(&self, new_rows: &[RaceResultRow]) -> Result<(), CacheError> {
        self.check_online()?;
        let mut rows = self.rows.lock().map_err(|_| Self::poisoned())?;
        rows.extend_from_slice(new_rows);
        Ok(())
    }

    async fn delete_row(&self, index: usize) -> Result<(), CacheError> {
        self.check_online()?;
        let mut rows = self.rows.lock().map_err(|_| Self::poisoned())?;
        if index >= rows.len() {
            return Err(CacheError::Malformed(format!(
                "row {} out of range ({} rows)",
                index,
                rows.len()
            )));
        }
        rows.remove(index);
        self.deleted.lock().map_err(|_| Self::poisoned())?.push(index);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory table".to_string()
    }
}
