///! Reference name list
///!
///! Loads the reference table (name + optional image URL) from CSV and
///! answers both questions the matcher asks: "is this key listed?" and
///! "which image goes with this name?".
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::normalize::normalize_name;

/// One reference row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub canonical_name: String,
    pub image_url: Option<String>,
}

/// Raw CSV row (`kettou,url`)
#[derive(Debug, Deserialize)]
struct ReferenceCsvRow {
    #[serde(default)]
    kettou: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Reference entries indexed by canonical name and by normalized key
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    /// Canonical name -> entry
    entries: HashMap<String, ReferenceEntry>,

    /// Normalized key -> canonical name
    keys: HashMap<String, String>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = ReferenceEntry>) -> Self {
        let mut index = Self::new();
        for entry in entries {
            index.insert(entry);
        }
        index
    }

    /// Later rows with the same canonical name replace earlier ones.
    pub fn insert(&mut self, entry: ReferenceEntry) {
        let key = normalize_name(&entry.canonical_name);
        if key.is_empty() {
            return;
        }
        self.keys.insert(key, entry.canonical_name.clone());
        self.entries.insert(entry.canonical_name.clone(), entry);
    }

    /// Load from CSV file
    pub async fn load_from_csv(csv_path: impl AsRef<Path>) -> Result<Self> {
        let csv_path_str = csv_path.as_ref().to_string_lossy().to_string();
        tracing::info!("Loading reference list from: {}", csv_path_str);

        let content = tokio::fs::read_to_string(&csv_path)
            .await
            .context(format!("Failed to read reference CSV: {}", csv_path_str))?;

        let index = Self::parse_csv(&content)?;

        tracing::info!("Loaded {} reference names", index.len());
        Ok(index)
    }

    /// Parse CSV content with a `kettou,url` header
    pub fn parse_csv(content: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader.headers().context("Reference CSV has no header row")?;
        if !headers.iter().any(|h| h.trim() == "kettou") {
            anyhow::bail!("Reference CSV is missing the 'kettou' column");
        }

        let mut index = Self::new();
        let mut skipped = 0;

        for (row_no, result) in reader.deserialize::<ReferenceCsvRow>().enumerate() {
            match result {
                Ok(row) => {
                    let Some(name) = row.kettou.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
                    else {
                        skipped += 1;
                        continue;
                    };
                    let image_url = row
                        .url
                        .map(|u| u.trim().to_string())
                        .filter(|u| !u.is_empty());
                    index.insert(ReferenceEntry {
                        canonical_name: name,
                        image_url,
                    });
                }
                Err(e) => {
                    skipped += 1;
                    tracing::warn!("Error parsing reference CSV row {}: {}", row_no + 2, e);
                }
            }
        }

        tracing::debug!("Reference CSV parsed: {} names, {} rows skipped", index.len(), skipped);
        Ok(index)
    }

    /// Membership test on an already normalized key
    pub fn contains(&self, normalized_key: &str) -> bool {
        self.keys.contains_key(normalized_key)
    }

    /// Image for a name.
    ///
    /// Exact canonical spelling first, then any entry sharing the name's
    /// normalized key, so width/case variants still find their image.
    pub fn image_for(&self, name: &str) -> Option<&str> {
        if let Some(entry) = self.entries.get(name) {
            return entry.image_url.as_deref();
        }
        let canonical = self.keys.get(&normalize_name(name))?;
        self.entries.get(canonical)?.image_url.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "kettou,url
スペシャルウィーク,https://img.example/special-week.png
サイレンススズカ,
Gold Ship,https://img.example/gold-ship.png
,https://img.example/orphan.png
";

    #[test]
    fn test_parse_csv() {
        let index = ReferenceIndex::parse_csv(SAMPLE_CSV).unwrap();
        assert_eq!(index.len(), 3);
        assert!(index.contains("スペシャルウィーク"));
        assert!(index.contains("gold ship"));
        assert!(!index.contains("Gold Ship")); // keys are normalized
    }

    #[test]
    fn test_empty_url_is_none() {
        let index = ReferenceIndex::parse_csv(SAMPLE_CSV).unwrap();
        assert_eq!(index.image_for("サイレンススズカ"), None);
        assert_eq!(
            index.image_for("スペシャルウィーク"),
            Some("https://img.example/special-week.png")
        );
    }

    #[test]
    fn test_image_for_width_variant() {
        let index = ReferenceIndex::parse_csv(SAMPLE_CSV).unwrap();
        assert_eq!(
            index.image_for("ＧＯＬＤ ＳＨＩＰ"),
            Some("https://img.example/gold-ship.png")
        );
        assert_eq!(index.image_for("Unknown"), None);
    }

    #[test]
    fn test_missing_column_is_error() {
        assert!(ReferenceIndex::parse_csv("name,url\nA,b\n").is_err());
    }

    #[tokio::test]
    async fn test_load_from_csv_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reference.csv");
        tokio::fs::write(&path, SAMPLE_CSV).await.unwrap();

        let index = ReferenceIndex::load_from_csv(&path).await.unwrap();
        assert_eq!(index.len(), 3);
    }
}
