use serde::{Deserialize, Serialize};

/// Placeholder stored and shown when an entrant has no matched ancestor
pub const NO_MATCH: &str = "該当なし";

/// Separator between rendered match entries
pub const MATCH_SEPARATOR: &str = "<br>";

/// JRA racecourse, with the two digit code used inside race ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    Sapporo,
    Hakodate,
    Fukushima,
    Niigata,
    Tokyo,
    Nakayama,
    Chukyo,
    Kyoto,
    Hanshin,
    Kokura,
}

impl Venue {
    pub const ALL: [Venue; 10] = [
        Venue::Sapporo,
        Venue::Hakodate,
        Venue::Fukushima,
        Venue::Niigata,
        Venue::Tokyo,
        Venue::Nakayama,
        Venue::Chukyo,
        Venue::Kyoto,
        Venue::Hanshin,
        Venue::Kokura,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Venue::Sapporo => "01",
            Venue::Hakodate => "02",
            Venue::Fukushima => "03",
            Venue::Niigata => "04",
            Venue::Tokyo => "05",
            Venue::Nakayama => "06",
            Venue::Chukyo => "07",
            Venue::Kyoto => "08",
            Venue::Hanshin => "09",
            Venue::Kokura => "10",
        }
    }

    /// Name as printed in schedules
    pub fn name(&self) -> &'static str {
        match self {
            Venue::Sapporo => "札幌",
            Venue::Hakodate => "函館",
            Venue::Fukushima => "福島",
            Venue::Niigata => "新潟",
            Venue::Tokyo => "東京",
            Venue::Nakayama => "中山",
            Venue::Chukyo => "中京",
            Venue::Kyoto => "京都",
            Venue::Hanshin => "阪神",
            Venue::Kokura => "小倉",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|v| v.name() == name)
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Venue {
    type Err = String;

    /// Accepts the Japanese name, the two digit code or the romanized name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(venue) = Self::from_name(s) {
            return Ok(venue);
        }
        if let Some(venue) = Self::ALL.into_iter().find(|v| v.code() == s) {
            return Ok(venue);
        }
        match s.to_lowercase().as_str() {
            "sapporo" => Ok(Venue::Sapporo),
            "hakodate" => Ok(Venue::Hakodate),
            "fukushima" => Ok(Venue::Fukushima),
            "niigata" => Ok(Venue::Niigata),
            "tokyo" => Ok(Venue::Tokyo),
            "nakayama" => Ok(Venue::Nakayama),
            "chukyo" => Ok(Venue::Chukyo),
            "kyoto" => Ok(Venue::Kyoto),
            "hanshin" => Ok(Venue::Hanshin),
            "kokura" => Ok(Venue::Kokura),
            _ => Err(format!("Unknown venue: {}", s)),
        }
    }
}

/// Race identifier as used by the race listing site and as the cache key.
///
/// Well-formed ids are 12 digits: year, venue code, meeting, day, race number.
/// Ids typed in by a user are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RaceId(String);

impl RaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    /// Build an id from its parts, e.g. 2025 東京 1回 8日目 11R -> "202505010811"
    pub fn compose(
        year: i32,
        venue: Venue,
        meeting: u32,
        day: u32,
        race_no: u32,
    ) -> Result<Self, String> {
        if !(1..=12).contains(&race_no) {
            return Err(format!("Race number out of range (1..12): {}", race_no));
        }
        if meeting == 0 || meeting > 99 || day == 0 || day > 99 {
            return Err(format!("Invalid meeting/day: {}/{}", meeting, day));
        }
        Ok(Self(format!(
            "{}{}{:02}{:02}{:02}",
            year,
            venue.code(),
            meeting,
            day,
            race_no
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Venue encoded in a well-formed id
    pub fn venue(&self) -> Option<Venue> {
        let code = self.0.get(4..6)?;
        Venue::ALL.into_iter().find(|v| v.code() == code)
    }

    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 12 && self.0.bytes().all(|b| b.is_ascii_digit()) && self.venue().is_some()
    }
}

impl std::fmt::Display for RaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RaceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One persisted result row, one per entrant in a race.
///
/// Column names match the header row of the shared cache sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceResultRow {
    #[serde(rename = "馬名")]
    pub entrant_name: String,
    #[serde(rename = "該当数")]
    pub match_count: u32,
    #[serde(rename = "該当箇所")]
    pub rendered_matches: String,
    #[serde(rename = "race_id", default)]
    pub race_id: String,
}

impl RaceResultRow {
    pub const HEADERS: [&'static str; 4] = ["馬名", "該当数", "該当箇所", "race_id"];

    pub fn new(entrant_name: impl Into<String>, match_count: u32, rendered_matches: impl Into<String>) -> Self {
        Self {
            entrant_name: entrant_name.into(),
            match_count,
            rendered_matches: rendered_matches.into(),
            race_id: String::new(),
        }
    }

    /// Field values in header order
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.entrant_name.clone(),
            self.match_count.to_string(),
            self.rendered_matches.clone(),
            self.race_id.clone(),
        ]
    }
}

/// Where a cache hit was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
    Remote,
    Local,
}

/// Result for one entrant, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrantEvent {
    /// 1-based position in the listing
    pub index: usize,
    pub entrant_name: String,
    pub match_count: u32,
    pub rendered_matches: String,
}

impl EntrantEvent {
    pub fn from_row(index: usize, row: &RaceResultRow) -> Self {
        Self {
            index,
            entrant_name: row.entrant_name.clone(),
            match_count: row.match_count,
            rendered_matches: row.rendered_matches.clone(),
        }
    }
}

/// Progress of one race search, in emission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SearchEvent {
    CacheHit { source: CacheSource, rows: usize },
    CacheUnavailable { error: String },
    EntrantsListed { count: usize },
    ListingFailed { error: String },
    Entrant(EntrantEvent),
    EntrantFailed { index: usize, entrant_name: String, error: String },
    Persisted { rows: usize },
    PersistFailed { error: String },
    NothingToPersist,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_race_id() {
        let id = RaceId::compose(2025, Venue::Tokyo, 1, 8, 11).unwrap();
        assert_eq!(id.as_str(), "202505010811");
        assert_eq!(id.venue(), Some(Venue::Tokyo));
        assert!(id.is_well_formed());
    }

    #[test]
    fn test_compose_rejects_bad_race_number() {
        assert!(RaceId::compose(2025, Venue::Kyoto, 2, 1, 0).is_err());
        assert!(RaceId::compose(2025, Venue::Kyoto, 2, 1, 13).is_err());
    }

    #[test]
    fn test_free_form_race_id_is_kept() {
        let id = RaceId::new("  abc ");
        assert_eq!(id.as_str(), "abc");
        assert!(!id.is_well_formed());
    }

    #[test]
    fn test_venue_parse() {
        assert_eq!("阪神".parse::<Venue>().unwrap(), Venue::Hanshin);
        assert_eq!("10".parse::<Venue>().unwrap(), Venue::Kokura);
        assert_eq!("Nakayama".parse::<Venue>().unwrap(), Venue::Nakayama);
        assert!("大井".parse::<Venue>().is_err());
    }

    #[test]
    fn test_search_event_json_tag() {
        let event = SearchEvent::Entrant(EntrantEvent {
            index: 1,
            entrant_name: "テスト".to_string(),
            match_count: 0,
            rendered_matches: NO_MATCH.to_string(),
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event":"entrant""#));
        assert!(json.contains(r#""index":1"#));

        let json = serde_json::to_string(&SearchEvent::NothingToPersist).unwrap();
        assert_eq!(json, r#"{"event":"nothing_to_persist"}"#);
    }
}
