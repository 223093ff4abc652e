///! Local file copy of race results, one CSV per race id
use kettou_common::{RaceId, RaceResultRow};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::error::CacheError;

pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{dir}/{race_id}.csv`, the id percent-encoded so distinct ids never
    /// share a file
    pub fn path_for(&self, race_id: &RaceId) -> PathBuf {
        self.dir.join(format!("{}.csv", file_stem(race_id)))
    }

    /// Full read; a missing or empty file is `None`.
    /// Rows stamped with another race id are ignored.
    pub async fn load(&self, race_id: &RaceId) -> Result<Option<Vec<RaceResultRow>>, CacheError> {
        let path = self.path_for(race_id);
        if !path.exists() {
            debug!("No local cache file for race {}: {:?}", race_id, path);
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let rows: Vec<RaceResultRow> = parse_rows(&content)?
            .into_iter()
            .filter(|row| row.race_id == race_id.as_str())
            .collect();
        if rows.is_empty() {
            return Ok(None);
        }

        debug!("Loaded {} rows for race {} from {:?}", rows.len(), race_id, path);
        Ok(Some(rows))
    }

    /// Full overwrite of the race's file
    pub async fn save(&self, race_id: &RaceId, rows: &[RaceResultRow]) -> Result<(), CacheError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).await?;
            info!("Created local cache directory: {:?}", self.dir);
        }

        let path = self.path_for(race_id);
        let tmp_path = path.with_extension("csv.tmp");
        fs::write(&tmp_path, to_csv(rows)?).await?;
        fs::rename(&tmp_path, &path).await?;

        debug!("Saved {} rows for race {} to {:?}", rows.len(), race_id, path);
        Ok(())
    }
}

/// Percent-encoded id; '.' is encoded too so no stem is "." or ".."
fn file_stem(race_id: &RaceId) -> String {
    urlencoding::encode(race_id.as_str()).replace('.', "%2E")
}

fn to_csv(rows: &[RaceResultRow]) -> Result<Vec<u8>, CacheError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record(RaceResultRow::HEADERS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| CacheError::Io(e.into_error()))
}

fn parse_rows(content: &str) -> Result<Vec<RaceResultRow>, CacheError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(name: &str, count: u32, rendered: &str) -> RaceResultRow {
        let mut row = RaceResultRow::new(name, count, rendered);
        row.race_id = "202505010811".to_string();
        row
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path().join("cache"));
        let race_id = RaceId::new("202505010811");

        let rows = vec![
            row("ホースA", 2, "<img src='https://img.example/a.png' width='100'>【父】A<br>【母父】B"),
            row("ホースB", 0, "該当なし"),
        ];
        store.save(&race_id, &rows).await.unwrap();

        let loaded = store.load(&race_id).await.unwrap().unwrap();
        assert_eq!(loaded, rows);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());
        let race_id = RaceId::new("202505010811");

        store
            .save(&race_id, &[row("A", 0, "該当なし"), row("B", 0, "該当なし")])
            .await
            .unwrap();
        store.save(&race_id, &[row("C", 1, "【父】X")]).await.unwrap();

        let loaded = store.load(&race_id).await.unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].entrant_name, "C");
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());
        assert!(store.load(&RaceId::new("000000000000")).await.unwrap().is_none());
    }

    #[test]
    fn test_path_is_encoded() {
        let store = LocalStore::new("cache");
        let path = store.path_for(&RaceId::new("../../etc/passwd"));
        assert_eq!(path, Path::new("cache").join("%2E%2E%2F%2E%2E%2Fetc%2Fpasswd.csv"));
        assert_eq!(
            store.path_for(&RaceId::new("202505010811")),
            Path::new("cache").join("202505010811.csv")
        );
    }

    #[tokio::test]
    async fn test_similar_ids_do_not_share_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());
        let dotted = RaceId::new("2025.05");
        let underscored = RaceId::new("2025_05");
        assert_ne!(store.path_for(&dotted), store.path_for(&underscored));

        let mut stamped = row("HorseOfA", 1, "【父】X");
        stamped.race_id = dotted.to_string();
        store.save(&dotted, &[stamped]).await.unwrap();

        assert!(store.load(&underscored).await.unwrap().is_none());
        assert_eq!(store.load(&dotted).await.unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rows_of_other_races_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());
        let race_id = RaceId::new("202505010812");

        // rows stamped 202505010811 written under another id's file
        store.save(&race_id, &[row("A", 0, "該当なし")]).await.unwrap();
        assert!(store.load(&race_id).await.unwrap().is_none());
    }

    #[test]
    fn test_header_row_uses_sheet_columns() {
        let bytes = to_csv(&[row("A", 1, "【父】X")]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("馬名,該当数,該当箇所,race_id"));
    }
}
