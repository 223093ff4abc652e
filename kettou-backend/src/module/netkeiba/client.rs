///! netkeiba race source
///!
///! Fetches race cards from race.netkeiba.com and pedigree tables from
///! db.netkeiba.com. Both sites serve EUC-JP.
use anyhow::{Context, Result};
use async_trait::async_trait;
use kettou_common::RaceId;
use reqwest::Client;
use std::time::Duration;

use super::parser::{horse_id_from_url, parse_ancestor_cells, parse_entrants, DB_BASE_URL};
use crate::module::search::{Entrant, RaceSource};

const RACE_CARD_URL: &str = "https://race.netkeiba.com/race/shutuba.html";
const PAGE_CHARSET: &str = "EUC-JP";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct NetkeibaSource {
    client: Client,
}

impl NetkeibaSource {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch {}: HTTP {}", url, response.status()));
        }

        response
            .text_with_charset(PAGE_CHARSET)
            .await
            .with_context(|| format!("Failed to read body of {}", url))
    }
}

pub fn race_card_url(race_id: &RaceId) -> String {
    format!("{}?race_id={}", RACE_CARD_URL, urlencoding::encode(race_id.as_str()))
}

pub fn pedigree_url(horse_id: &str) -> String {
    format!("{}/horse/ped/{}/", DB_BASE_URL, horse_id)
}

#[async_trait]
impl RaceSource for NetkeibaSource {
    async fn fetch_entrants(&self, race_id: &RaceId) -> Result<Vec<Entrant>> {
        let html = self.fetch_page(&race_card_url(race_id)).await?;
        let entrants = parse_entrants(&html)
            .with_context(|| format!("Failed to parse race card of {}", race_id))?;

        tracing::info!("Race card {}: {} horses", race_id, entrants.len());
        Ok(entrants.into_vec())
    }

    async fn fetch_ancestor_cells(&self, entrant: &Entrant) -> Result<Vec<Option<String>>> {
        let horse_id = horse_id_from_url(&entrant.profile_url).with_context(|| {
            format!("No horse id in profile URL '{}'", entrant.profile_url)
        })?;

        let html = self.fetch_page(&pedigree_url(horse_id)).await?;
        parse_ancestor_cells(&html)
            .with_context(|| format!("Failed to parse pedigree of {}", entrant.name))
    }
}
