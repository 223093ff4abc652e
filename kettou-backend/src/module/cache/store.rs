///! Two-tier result cache: remote table first, local CSV copy behind it
use kettou_common::{CacheSource, RaceId, RaceResultRow};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::CacheError;
use super::local::LocalStore;
use super::remote::RemoteTable;

pub struct ResultCache {
    remote: Option<Arc<dyn RemoteTable>>,
    local: LocalStore,
}

impl ResultCache {
    pub fn new(remote: Arc<dyn RemoteTable>, local: LocalStore) -> Self {
        Self {
            remote: Some(remote),
            local,
        }
    }

    /// Offline mode: only the local files are read and written
    pub fn local_only(local: LocalStore) -> Self {
        Self {
            remote: None,
            local,
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Cached rows for a race.
    ///
    /// Remote rows whose race id equals `race_id` win, in backend order. With
    /// no remote rows the local file is tried. A remote failure is returned
    /// as an error, not as a miss.
    pub async fn get(&self, race_id: &RaceId) -> Result<Option<Vec<RaceResultRow>>, CacheError> {
        Ok(self.lookup(race_id).await?.map(|(_, rows)| rows))
    }

    /// Like `get`, also telling which tier answered
    pub async fn lookup(
        &self,
        race_id: &RaceId,
    ) -> Result<Option<(CacheSource, Vec<RaceResultRow>)>, CacheError> {
        if let Some(remote) = &self.remote {
            let rows: Vec<RaceResultRow> = remote
                .read_rows()
                .await?
                .into_iter()
                .filter(|row| row.race_id == race_id.as_str())
                .collect();

            if !rows.is_empty() {
                info!("Cache hit for race {}: {} rows from {}", race_id, rows.len(), remote.describe());
                return Ok(Some((CacheSource::Remote, rows)));
            }
            debug!("No rows for race {} in {}", race_id, remote.describe());
        }

        Ok(self.get_local(race_id).await?.map(|rows| (CacheSource::Local, rows)))
    }

    /// Local file only, for use when the remote backend is down
    pub async fn get_local(&self, race_id: &RaceId) -> Result<Option<Vec<RaceResultRow>>, CacheError> {
        let rows = self.local.load(race_id).await?;
        if let Some(rows) = &rows {
            info!("Cache hit for race {}: {} rows from local file", race_id, rows.len());
        }
        Ok(rows)
    }

    /// Replace the cached rows of a race.
    ///
    /// Rows are stamped with `race_id`. Remote rows of the race are deleted
    /// (last first, so earlier positions stay valid) before the new rows are
    /// appended. The local file is rewritten even if the remote step failed;
    /// the remote error is returned afterwards.
    ///
    /// Not atomic: two writers replacing the same race can interleave.
    pub async fn put(&self, race_id: &RaceId, rows: &[RaceResultRow]) -> Result<(), CacheError> {
        let rows: Vec<RaceResultRow> = rows
            .iter()
            .cloned()
            .map(|mut row| {
                row.race_id = race_id.to_string();
                row
            })
            .collect();

        let remote_result = match &self.remote {
            Some(remote) => replace_remote(remote.as_ref(), race_id, &rows).await,
            None => Ok(()),
        };

        let local_result = self.local.save(race_id, &rows).await;

        match (remote_result, local_result) {
            (Ok(()), Ok(())) => {
                info!("Cached {} rows for race {}", rows.len(), race_id);
                Ok(())
            }
            (Err(remote_err), Ok(())) => {
                warn!("Race {} saved locally only: {}", race_id, remote_err);
                Err(remote_err)
            }
            (Ok(()), Err(local_err)) => Err(local_err),
            (Err(remote_err), Err(local_err)) => {
                warn!("Local cache write for race {} failed too: {}", race_id, local_err);
                Err(remote_err)
            }
        }
    }
}

async fn replace_remote(
    remote: &dyn RemoteTable,
    race_id: &RaceId,
    rows: &[RaceResultRow],
) -> Result<(), CacheError> {
    let stale: Vec<usize> = remote
        .read_rows()
        .await?
        .iter()
        .enumerate()
        .filter(|(_, row)| row.race_id == race_id.as_str())
        .map(|(index, _)| index)
        .collect();

    if !stale.is_empty() {
        debug!("Deleting {} stale rows for race {}", stale.len(), race_id);
    }
    for &index in stale.iter().rev() {
        remote.delete_row(index).await?;
    }

    remote.append_rows(rows).await
}
