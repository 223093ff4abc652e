use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use kettou_common::{RaceId, Venue};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

/// Race days offered before today
pub const DAYS_BACK: i64 = 31;
/// Race days offered after today
pub const DAYS_AHEAD: i64 = 7;

/// Raw schedule row, e.g. `2025,05/04(日),東京,2,4`
#[derive(Debug, Deserialize)]
struct ScheduleCsvRow {
    #[serde(rename = "年")]
    year: String,
    #[serde(rename = "月日(曜日)")]
    month_day: String,
    #[serde(rename = "競馬場")]
    venue: String,
    #[serde(rename = "開催回")]
    meeting: String,
    #[serde(rename = "日目")]
    day: String,
}

/// One race day at one venue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meeting {
    pub date: NaiveDate,
    pub venue: Venue,
    /// 開催回: meeting number of the year at this venue
    pub meeting: u32,
    /// 日目: day within the meeting
    pub day: u32,
}

impl Meeting {
    pub fn race_id(&self, race_no: u32) -> Result<RaceId> {
        RaceId::compose(self.date.year(), self.venue, self.meeting, self.day, race_no)
            .map_err(|e| anyhow::anyhow!(e))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schedule {
    meetings: Vec<Meeting>,
}

impl Schedule {
    pub fn new(meetings: Vec<Meeting>) -> Self {
        Self { meetings }
    }

    pub async fn load_from_csv(csv_path: impl AsRef<Path>) -> Result<Self> {
        let path = csv_path.as_ref();
        tracing::info!("Loading race schedule from: {}", path.display());

        let content = tokio::fs::read_to_string(path)
            .await
            .context(format!("Failed to read schedule file: {}", path.display()))?;

        let schedule = Self::parse_csv(&content)?;
        tracing::info!("Loaded {} race days", schedule.meetings.len());
        Ok(schedule)
    }

    /// Parse schedule CSV text.
    ///
    /// Rows that cannot be read (bad date, non-JRA venue) are skipped with a
    /// warning; missing columns fail the whole file.
    pub fn parse_csv(content: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let date_re = Regex::new(r"(\d{2}/\d{2})").context("Invalid date pattern")?;
        let mut meetings = Vec::new();

        for (i, result) in reader.deserialize::<ScheduleCsvRow>().enumerate() {
            let row_no = i + 2;
            let row = result.context(format!("Failed to parse schedule row {}", row_no))?;
            match parse_row(&row, &date_re) {
                Ok(meeting) => meetings.push(meeting),
                Err(e) => tracing::warn!("Skipping schedule row {}: {}", row_no, e),
            }
        }

        meetings.sort_by(|a, b| a.date.cmp(&b.date).then(a.venue.code().cmp(b.venue.code())));
        Ok(Self { meetings })
    }

    pub fn len(&self) -> usize {
        self.meetings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meetings.is_empty()
    }

    /// Venues racing on `date`, ordered by venue code
    pub fn meetings_on(&self, date: NaiveDate) -> Vec<&Meeting> {
        self.meetings.iter().filter(|m| m.date == date).collect()
    }

    /// Distinct race days from `today - DAYS_BACK` to `today + DAYS_AHEAD`
    /// inclusive, newest first
    pub fn dates_within(&self, today: NaiveDate) -> Vec<NaiveDate> {
        let from = today - Duration::days(DAYS_BACK);
        let to = today + Duration::days(DAYS_AHEAD);

        let mut dates: Vec<NaiveDate> = self
            .meetings
            .iter()
            .map(|m| m.date)
            .filter(|d| (from..=to).contains(d))
            .collect();
        dates.sort_unstable_by(|a, b| b.cmp(a));
        dates.dedup();
        dates
    }

    /// Race id for race `race_no` at `venue` on `date`
    pub fn race_id(&self, date: NaiveDate, venue: Venue, race_no: u32) -> Result<RaceId> {
        let meeting = self
            .meetings
            .iter()
            .find(|m| m.date == date && m.venue == venue)
            .with_context(|| format!("No race meeting at {} on {}", venue, date))?;
        meeting.race_id(race_no)
    }
}

fn parse_row(row: &ScheduleCsvRow, date_re: &Regex) -> Result<Meeting> {
    let year: i32 = leading_number(&row.year).context(format!("bad year '{}'", row.year))?;
    let month_day = date_re
        .captures(&row.month_day)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .with_context(|| format!("no MM/DD in '{}'", row.month_day))?;
    let date = NaiveDate::parse_from_str(&format!("{}/{}", year, month_day), "%Y/%m/%d")
        .context(format!("bad date '{}/{}'", year, month_day))?;

    let venue = Venue::from_name(row.venue.trim())
        .with_context(|| format!("unknown venue '{}'", row.venue))?;

    Ok(Meeting {
        date,
        venue,
        meeting: leading_number(&row.meeting).context(format!("bad meeting '{}'", row.meeting))?,
        day: leading_number(&row.day).context(format!("bad day '{}'", row.day))?,
    })
}

/// Number at the start of a cell: "2" and "2回" both give 2
fn leading_number<T: std::str::FromStr>(text: &str) -> Option<T> {
    let digits: String = text.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SCHEDULE: &str = "\
年,月日(曜日),競馬場,開催回,日目
2025,05/04(日),東京,2,4
2025,05/04(日),京都,3,4
2025,05/03(土),東京,2,3
2025,05/10(土),新潟,1回,1日
2025,13/40(土),東京,2,5
2025,05/11(日),大井,1,1
";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_skips_bad_rows() {
        let schedule = Schedule::parse_csv(SCHEDULE).unwrap();
        assert_eq!(schedule.len(), 4);
    }

    #[test]
    fn test_meetings_on() {
        let schedule = Schedule::parse_csv(SCHEDULE).unwrap();
        let venues: Vec<Venue> = schedule
            .meetings_on(date(2025, 5, 4))
            .iter()
            .map(|m| m.venue)
            .collect();
        assert_eq!(venues, vec![Venue::Tokyo, Venue::Kyoto]);
        assert!(schedule.meetings_on(date(2025, 5, 5)).is_empty());
    }

    #[test]
    fn test_race_id() {
        let schedule = Schedule::parse_csv(SCHEDULE).unwrap();
        let id = schedule.race_id(date(2025, 5, 4), Venue::Tokyo, 11).unwrap();
        assert_eq!(id.as_str(), "202505020411");

        let id = schedule.race_id(date(2025, 5, 10), Venue::Niigata, 1).unwrap();
        assert_eq!(id.as_str(), "202504010101");

        assert!(schedule.race_id(date(2025, 5, 4), Venue::Hanshin, 1).is_err());
        assert!(schedule.race_id(date(2025, 5, 4), Venue::Tokyo, 13).is_err());
    }

    #[test]
    fn test_dates_within_window() {
        let schedule = Schedule::parse_csv(SCHEDULE).unwrap();

        let dates = schedule.dates_within(date(2025, 5, 4));
        assert_eq!(dates, vec![date(2025, 5, 10), date(2025, 5, 4), date(2025, 5, 3)]);

        // 05/03 is 32 days before 06/04
        let dates = schedule.dates_within(date(2025, 6, 4));
        assert_eq!(dates, vec![date(2025, 5, 10), date(2025, 5, 4)]);
    }

    #[test]
    fn test_missing_column_is_error() {
        assert!(Schedule::parse_csv("年,競馬場\n2025,東京\n").is_err());
    }

    #[tokio::test]
    async fn test_load_from_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schedule.csv");
        tokio::fs::write(&path, SCHEDULE).await.unwrap();

        let schedule = Schedule::load_from_csv(&path).await.unwrap();
        assert_eq!(schedule.len(), 4);
    }
}
