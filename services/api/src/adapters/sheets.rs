//! services/api/src/adapters/sheets.rs
//!
//! This module contains the entry store adapter over the Google Sheets
//! values API. It implements the `EntryStore` port from the `core` crate:
//! `append` adds one row to the shared worksheet, `read_all` scans every
//! historical row back out. Calls are single-attempt with no retry; any
//! failure surfaces as a `PortError` for the caller to report.

use async_trait::async_trait;
use diet_tracker_core::domain::DietEntry;
use diet_tracker_core::ports::{EntryStore, PortError, PortResult};
use serde::Deserialize;
use serde_json::json;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An entry store adapter that talks to one worksheet of one spreadsheet.
pub struct SheetsEntryStore {
    http: reqwest::Client,
    spreadsheet_id: String,
    worksheet: String,
    access_token: String,
}

impl SheetsEntryStore {
    /// Creates a new `SheetsEntryStore`.
    pub fn new(
        spreadsheet_id: impl Into<String>,
        worksheet: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            spreadsheet_id: spreadsheet_id.into(),
            worksheet: worksheet.into(),
            access_token: access_token.into(),
        }
    }

    fn values_url(&self, suffix: &str) -> String {
        format!(
            "{}/{}/values/{}{}",
            SHEETS_API_BASE, self.spreadsheet_id, self.worksheet, suffix
        )
    }
}

//=========================================================================================
// Response Payloads and Row Parsing
//=========================================================================================

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Turns the raw cell grid into entries. The first row must be the fixed
/// column header; any drift there is a data error, not a crash. The API
/// omits trailing empty cells, so short rows are padded back to full width
/// before parsing.
fn parse_rows(mut values: Vec<Vec<String>>) -> PortResult<Vec<DietEntry>> {
    if values.is_empty() {
        return Ok(Vec::new());
    }

    let header = values.remove(0);
    if header != DietEntry::COLUMNS {
        return Err(PortError::Malformed(format!(
            "worksheet header {:?} does not match the expected columns",
            header
        )));
    }

    values
        .into_iter()
        .map(|mut row| {
            if row.len() < DietEntry::COLUMNS.len() {
                row.resize(DietEntry::COLUMNS.len(), String::new());
            }
            DietEntry::from_row(&row).map_err(|e| PortError::Malformed(e.to_string()))
        })
        .collect()
}

//=========================================================================================
// `EntryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl EntryStore for SheetsEntryStore {
    async fn append(&self, entry: &DietEntry) -> PortResult<()> {
        let url = self.values_url(":append?valueInputOption=USER_ENTERED");
        let body = json!({ "values": [entry.to_row()] });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unavailable(format!("sheet append failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PortError::Unavailable(format!(
                "sheet append returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn read_all(&self) -> PortResult<Vec<DietEntry>> {
        let url = self.values_url("");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| PortError::Unavailable(format!("sheet read failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PortError::Unavailable(format!(
                "sheet read returned {}",
                response.status()
            )));
        }

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| PortError::Malformed(format!("sheet response: {}", e)))?;
        parse_rows(range.values)
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn header() -> Vec<String> {
        DietEntry::COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    fn row(date: &str, dinner: &str) -> Vec<String> {
        vec![
            date.to_string(),
            "70".to_string(),
            "7".to_string(),
            "30".to_string(),
            "2".to_string(),
            "3".to_string(),
            "eggs".to_string(),
            "".to_string(),
            "rice".to_string(),
            "".to_string(),
            dinner.to_string(),
            "".to_string(),
        ]
    }

    #[test]
    fn empty_sheet_yields_no_entries() {
        assert!(parse_rows(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn parses_rows_in_order() {
        let entries =
            parse_rows(vec![header(), row("2024-01-05", "soup"), row("2024-01-06", "fish")])
                .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert_eq!(entries[1].dinner, "fish");
    }

    #[test]
    fn pads_trailing_empty_cells_the_api_drops() {
        let mut short = row("2024-01-05", "soup");
        short.truncate(11); // the API omits the trailing empty "bedtime" cell
        let entries = parse_rows(vec![header(), short]).unwrap();
        assert_eq!(entries[0].before_bed, "");
    }

    #[test]
    fn header_drift_is_a_data_error() {
        let mut drifted = header();
        drifted[1] = "Mass".to_string();
        assert!(matches!(
            parse_rows(vec![drifted, row("2024-01-05", "soup")]),
            Err(PortError::Malformed(_))
        ));
    }

    #[test]
    fn unparseable_cell_is_a_data_error() {
        let mut bad = row("2024-01-05", "soup");
        bad[2] = "late".to_string();
        assert!(matches!(
            parse_rows(vec![header(), bad]),
            Err(PortError::Malformed(_))
        ));
    }
}
