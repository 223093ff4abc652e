///! Remote row store interface
use async_trait::async_trait;
use kettou_common::RaceResultRow;

use super::error::CacheError;

/// Row-oriented table shared between runs.
///
/// Positions are 0-based data-row indices in the order `read_rows` returns
/// them; deleting a row shifts every later row up by one.
#[async_trait]
pub trait RemoteTable: Send + Sync {
    async fn read_rows(&self) -> Result<Vec<RaceResultRow>, CacheError>;

    /// Append after the last row, fields written as user-entered text
    async fn append_rows(&self, rows: &[RaceResultRow]) -> Result<(), CacheError>;

    async fn delete_row(&self, index: usize) -> Result<(), CacheError>;

    /// Short name for logs
    fn describe(&self) -> String {
        "remote table".to_string()
    }
}
