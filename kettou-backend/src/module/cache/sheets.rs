///! Google Sheets backed result table
///!
///! The worksheet holds a header row (`馬名, 該当数, 該当箇所, race_id`)
///! followed by one row per cached entrant. Data row `i` is sheet row `i + 2`.
use async_trait::async_trait;
use kettou_common::RaceResultRow;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::OnceCell;

use super::auth::ServiceAccountAuth;
use super::error::CacheError;
use super::remote::RemoteTable;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

pub struct SheetsTable {
    client: reqwest::Client,
    auth: ServiceAccountAuth,
    spreadsheet_id: String,
    sheet_name: String,
    /// Numeric worksheet id, needed for row deletion
    sheet_id: OnceCell<i64>,
    header_checked: OnceCell<()>,
}

impl SheetsTable {
    pub fn new(
        client: reqwest::Client,
        auth: ServiceAccountAuth,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            auth,
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            sheet_id: OnceCell::new(),
            header_checked: OnceCell::new(),
        }
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/{}/values/{}",
            SHEETS_API,
            self.spreadsheet_id,
            urlencoding::encode(&quoted_range(&self.sheet_name, range))
        )
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<Value>>, CacheError> {
        let token = self.auth.access_token().await?;
        let response = self
            .client
            .get(self.values_url(range))
            .query(&[("valueRenderOption", "UNFORMATTED_VALUE")])
            .bearer_auth(token)
            .send()
            .await?;

        let range: ValueRange = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| CacheError::Malformed(format!("values response: {}", e)))?;
        Ok(range.values)
    }

    async fn sheet_id(&self) -> Result<i64, CacheError> {
        self.sheet_id
            .get_or_try_init(|| async {
                let token = self.auth.access_token().await?;
                let response = self
                    .client
                    .get(format!("{}/{}", SHEETS_API, self.spreadsheet_id))
                    .query(&[("fields", "sheets.properties(sheetId,title)")])
                    .bearer_auth(token)
                    .send()
                    .await?;

                let meta: SpreadsheetMeta = check_status(response)
                    .await?
                    .json()
                    .await
                    .map_err(|e| CacheError::Malformed(format!("spreadsheet metadata: {}", e)))?;

                meta.sheets
                    .into_iter()
                    .find(|s| s.properties.title == self.sheet_name)
                    .map(|s| s.properties.sheet_id)
                    .ok_or_else(|| {
                        CacheError::Malformed(format!("worksheet '{}' not found", self.sheet_name))
                    })
            })
            .await
            .copied()
    }

    /// Write the header row into an empty worksheet
    async fn ensure_header(&self) -> Result<(), CacheError> {
        self.header_checked
            .get_or_try_init(|| async {
                let first_row = self.get_values("1:1").await?;
                if first_row.first().is_some_and(|r| !r.is_empty()) {
                    return Ok(());
                }
                tracing::info!("Worksheet '{}' is empty, writing header row", self.sheet_name);
                let header: Vec<String> =
                    RaceResultRow::HEADERS.iter().map(|h| h.to_string()).collect();
                self.append_values(vec![header]).await
            })
            .await
            .map(|_| ())
    }

    async fn append_values(&self, values: Vec<Vec<String>>) -> Result<(), CacheError> {
        let token = self.auth.access_token().await?;
        let url = format!("{}:append", self.values_url("A1"));
        let response = self
            .client
            .post(url)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(token)
            .json(&json!({ "values": values }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteTable for SheetsTable {
    async fn read_rows(&self) -> Result<Vec<RaceResultRow>, CacheError> {
        let values = self.get_values("A:D").await?;
        records_from_values(values)
    }

    async fn append_rows(&self, rows: &[RaceResultRow]) -> Result<(), CacheError> {
        if rows.is_empty() {
            return Ok(());
        }
        self.ensure_header().await?;
        let values = rows.iter().map(RaceResultRow::to_record).collect();
        self.append_values(values).await
    }

    async fn delete_row(&self, index: usize) -> Result<(), CacheError> {
        let sheet_id = self.sheet_id().await?;
        let token = self.auth.access_token().await?;
        let response = self
            .client
            .post(format!("{}/{}:batchUpdate", SHEETS_API, self.spreadsheet_id))
            .bearer_auth(token)
            .json(&delete_row_request(sheet_id, index))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sheet '{}' of {}", self.sheet_name, self.spreadsheet_id)
    }
}

/// `'Sheet name'!A1` style range
fn quoted_range(sheet_name: &str, range: &str) -> String {
    format!("'{}'!{}", sheet_name.replace('\'', "''"), range)
}

/// batchUpdate body removing data row `index` (the header is grid row 0)
fn delete_row_request(sheet_id: i64, index: usize) -> Value {
    json!({
        "requests": [{
            "deleteDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": index + 1,
                    "endIndex": index + 2,
                }
            }
        }]
    })
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CacheError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match status.as_u16() {
        401 | 403 => Err(CacheError::Auth(format!("HTTP {}: {}", status, body))),
        429 => Err(CacheError::RateLimited),
        code => Err(CacheError::Remote { status: code, body }),
    }
}

/// Render a cell the way it reads in the sheet; integral numbers lose `.0`
fn cell_to_string(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                    Some(f) => f.to_string(),
                    None => n.to_string(),
                }
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Map raw sheet values (header row first) to rows.
///
/// Every data row yields a record, blank ones included, so positions stay
/// aligned with sheet rows.
fn records_from_values(values: Vec<Vec<Value>>) -> Result<Vec<RaceResultRow>, CacheError> {
    let mut rows = values.into_iter();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    let header: Vec<String> = header.iter().map(|c| cell_to_string(c).trim().to_string()).collect();
    let column = |name: &str| -> Result<usize, CacheError> {
        header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CacheError::Malformed(format!("missing column '{}'", name)))
    };
    let [name_col, count_col, matches_col, race_col] = [
        column(RaceResultRow::HEADERS[0])?,
        column(RaceResultRow::HEADERS[1])?,
        column(RaceResultRow::HEADERS[2])?,
        column(RaceResultRow::HEADERS[3])?,
    ];

    let records = rows
        .enumerate()
        .map(|(i, row)| {
            let cell = |col: usize| row.get(col).map(cell_to_string).unwrap_or_default();
            let count_text = cell(count_col);
            let match_count = count_text.trim().parse::<u32>().unwrap_or_else(|_| {
                if !count_text.trim().is_empty() {
                    tracing::warn!("Sheet row {}: bad match count {:?}", i + 2, count_text);
                }
                0
            });
            RaceResultRow {
                entrant_name: cell(name_col),
                match_count,
                rendered_matches: cell(matches_col),
                race_id: cell(race_col),
            }
        })
        .collect();

    Ok(records)
}
