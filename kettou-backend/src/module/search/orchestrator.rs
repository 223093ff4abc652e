///! Race search: serve cached results or fetch, match and persist
use anyhow::Result;
use async_stream::stream;
use futures::Stream;
use kettou_common::{CacheSource, EntrantEvent, RaceId, RaceResultRow, SearchEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::source::{Entrant, EntrantList, RaceSource};
use crate::module::cache::ResultCache;
use crate::module::pedigree::{
    match_pedigree, position_labels, render_matches, Pedigree, PositionLabel, ReferenceIndex,
    DEFAULT_PEDIGREE_DEPTH,
};

/// Pause between entrants, to keep the request rate polite
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(1200);

/// What to do when the remote cache cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheFallback {
    /// Serve the local file if there is one, otherwise fetch
    #[default]
    Local,
    /// Ignore the cache and fetch
    Refetch,
    /// Stop the search
    Abort,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub request_delay: Duration,
    pub fallback: CacheFallback,
    pub pedigree_depth: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            request_delay: DEFAULT_REQUEST_DELAY,
            fallback: CacheFallback::default(),
            pedigree_depth: DEFAULT_PEDIGREE_DEPTH,
        }
    }
}

/// Race search coordinator
pub struct RaceSearch {
    reference: Arc<ReferenceIndex>,
    cache: Arc<ResultCache>,
    source: Arc<dyn RaceSource>,
    labels: Vec<PositionLabel>,
    options: SearchOptions,
}

impl RaceSearch {
    pub fn new(
        reference: Arc<ReferenceIndex>,
        cache: Arc<ResultCache>,
        source: Arc<dyn RaceSource>,
        options: SearchOptions,
    ) -> Self {
        let labels = position_labels(options.pedigree_depth);
        Self {
            reference,
            cache,
            source,
            labels,
            options,
        }
    }

    /// Search one race.
    ///
    /// Events arrive in order: optional cache events, the listing, one event
    /// per entrant, then the persist outcome. Entrants are handled one at a
    /// time; a failing entrant is reported and skipped. Dropping the stream
    /// stops the search.
    pub fn search(
        &self,
        race_id: RaceId,
        prefer_cache: bool,
    ) -> impl Stream<Item = SearchEvent> + '_ {
        stream! {
            if prefer_cache {
                match self.cache.lookup(&race_id).await {
                    Ok(Some((source, rows))) => {
                        for event in cached_events(source, &rows) {
                            yield event;
                        }
                        return;
                    }
                    Ok(None) => {
                        debug!("No cached results for race {}", race_id);
                    }
                    Err(e) if !e.is_remote() => {
                        warn!("Local cache unreadable for race {}, fetching: {}", race_id, e);
                    }
                    Err(e) => {
                        warn!("Result cache unavailable for race {}: {}", race_id, e);
                        yield SearchEvent::CacheUnavailable { error: e.to_string() };

                        match self.options.fallback {
                            CacheFallback::Abort => return,
                            CacheFallback::Refetch => {}
                            CacheFallback::Local => match self.cache.get_local(&race_id).await {
                                Ok(Some(rows)) => {
                                    for event in cached_events(CacheSource::Local, &rows) {
                                        yield event;
                                    }
                                    return;
                                }
                                Ok(None) => {}
                                Err(e) => warn!("Local cache unreadable for race {}: {}", race_id, e),
                            },
                        }
                    }
                }
            }

            let entrants = match self.source.fetch_entrants(&race_id).await {
                Ok(entrants) => entrants.into_iter().collect::<EntrantList>().into_vec(),
                Err(e) => {
                    error!("Failed to fetch entrants for race {}: {:#}", race_id, e);
                    yield SearchEvent::ListingFailed { error: format!("{:#}", e) };
                    return;
                }
            };

            info!("Race {}: {} entrants", race_id, entrants.len());
            yield SearchEvent::EntrantsListed { count: entrants.len() };

            let mut rows = Vec::with_capacity(entrants.len());
            for (i, entrant) in entrants.iter().enumerate() {
                if i > 0 && !self.options.request_delay.is_zero() {
                    tokio::time::sleep(self.options.request_delay).await;
                }
                let index = i + 1;

                match self.process_entrant(&race_id, entrant).await {
                    Ok(row) => {
                        debug!("{}. {}: {} matches", index, row.entrant_name, row.match_count);
                        yield SearchEvent::Entrant(EntrantEvent::from_row(index, &row));
                        rows.push(row);
                    }
                    Err(e) => {
                        warn!("{}. {}: {:#}", index, entrant.name, e);
                        yield SearchEvent::EntrantFailed {
                            index,
                            entrant_name: entrant.name.clone(),
                            error: format!("{:#}", e),
                        };
                    }
                }
            }

            if rows.is_empty() {
                yield SearchEvent::NothingToPersist;
                return;
            }

            match self.cache.put(&race_id, &rows).await {
                Ok(()) => {
                    yield SearchEvent::Persisted { rows: rows.len() };
                }
                Err(e) => {
                    error!("Failed to cache results for race {}: {}", race_id, e);
                    yield SearchEvent::PersistFailed { error: e.to_string() };
                }
            }
        }
    }

    /// Fetch, match and render one entrant
    async fn process_entrant(&self, race_id: &RaceId, entrant: &Entrant) -> Result<RaceResultRow> {
        let cells = self.source.fetch_ancestor_cells(entrant).await?;
        let pedigree = Pedigree::from_cells(&self.labels, cells);
        let matches = match_pedigree(&pedigree, &self.reference);

        let mut row = RaceResultRow::new(
            entrant.name.clone(),
            matches.len() as u32,
            render_matches(&matches),
        );
        row.race_id = race_id.to_string();
        Ok(row)
    }
}

fn cached_events(source: CacheSource, rows: &[RaceResultRow]) -> Vec<SearchEvent> {
    let mut events = Vec::with_capacity(rows.len() + 1);
    events.push(SearchEvent::CacheHit {
        source,
        rows: rows.len(),
    });
    events.extend(
        rows.iter()
            .enumerate()
            .map(|(i, row)| SearchEvent::Entrant(EntrantEvent::from_row(i + 1, row))),
    );
    events
}
