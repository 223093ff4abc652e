///! Process-wide state, built once at startup
use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::BackendConfig;
use crate::module::cache::{LocalStore, ResultCache, ServiceAccountAuth, ServiceAccountKey, SheetsTable};
use crate::module::netkeiba::NetkeibaSource;
use crate::module::pedigree::{ReferenceIndex, DEFAULT_PEDIGREE_DEPTH};
use crate::module::search::{RaceSearch, RaceSource, SearchOptions};

pub struct AppContext {
    pub reference: Arc<ReferenceIndex>,
    pub cache: Arc<ResultCache>,
    pub source: Arc<dyn RaceSource>,
    pub options: SearchOptions,
}

impl AppContext {
    /// Load the reference list and wire up the cache and race source.
    ///
    /// With `offline` set, or Sheets disabled in the config, the cache is
    /// local files only.
    pub async fn build(config: &BackendConfig, offline: bool) -> Result<Self> {
        let reference = ReferenceIndex::load_from_csv(&config.reference.csv_path)
            .await
            .context("Failed to load reference list")?;
        if reference.is_empty() {
            tracing::warn!("Reference list {} is empty", config.reference.csv_path.display());
        }

        let source = NetkeibaSource::new(&config.scrape.user_agent, config.scrape.timeout())?;
        let cache = build_cache(config, offline)?;

        let options = SearchOptions {
            request_delay: config.scrape.request_delay(),
            fallback: config.cache.fallback,
            pedigree_depth: DEFAULT_PEDIGREE_DEPTH,
        };

        Ok(Self::with_parts(Arc::new(reference), Arc::new(cache), Arc::new(source), options))
    }

    pub fn with_parts(
        reference: Arc<ReferenceIndex>,
        cache: Arc<ResultCache>,
        source: Arc<dyn RaceSource>,
        options: SearchOptions,
    ) -> Self {
        Self {
            reference,
            cache,
            source,
            options,
        }
    }

    pub fn race_search(&self) -> RaceSearch {
        RaceSearch::new(
            self.reference.clone(),
            self.cache.clone(),
            self.source.clone(),
            self.options.clone(),
        )
    }
}

fn build_cache(config: &BackendConfig, offline: bool) -> Result<ResultCache> {
    let local = LocalStore::new(&config.cache.dir);

    if offline || !config.sheets.enabled {
        tracing::info!("Result cache: local files in {}", config.cache.dir.display());
        return Ok(ResultCache::local_only(local));
    }

    if config.sheets.spreadsheet_id.is_empty() {
        anyhow::bail!("sheets.enabled is set but sheets.spreadsheet_id is empty");
    }

    let key = ServiceAccountKey::from_env_or_file(config.sheets.credentials_path.as_deref())?;
    let client = reqwest::Client::builder()
        .timeout(config.scrape.timeout())
        .build()
        .context("Failed to build HTTP client")?;
    let auth = ServiceAccountAuth::new(key, client.clone());
    tracing::info!(
        "Result cache: sheet '{}' as {}, local copy in {}",
        config.sheets.sheet_name,
        auth.client_email(),
        config.cache.dir.display()
    );

    let table = SheetsTable::new(
        client,
        auth,
        config.sheets.spreadsheet_id.clone(),
        config.sheets.sheet_name.clone(),
    );
    Ok(ResultCache::new(Arc::new(table), local))
}
