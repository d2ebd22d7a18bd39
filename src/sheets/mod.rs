mod client;
mod connect;

#[cfg(test)]
pub(crate) mod stub;

pub use client::Session;
pub use connect::{AccessConfig, Connector};

use crate::error::Result;
use async_trait::async_trait;
use google_sheets4::api;

/// Scope granting read/write access to all of the user's spreadsheets.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Scope needed by [`Session::find_spreadsheet`] to list spreadsheets through Drive.
pub const DRIVE_METADATA_SCOPE: &str = "https://www.googleapis.com/auth/drive.metadata.readonly";

/// A single cell, as exchanged with the Sheets API.
pub type CellValue = serde_json::Value;

/// Block of cell values occupying an A1-notation range.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueRange {
    pub range: String,
    pub values: Vec<Vec<CellValue>>,
}

impl ValueRange {
    pub(crate) fn from_api(response: api::ValueRange, requested_range: &str) -> Self {
        Self {
            range: response
                .range
                .unwrap_or_else(|| requested_range.to_string()),
            values: response.values.unwrap_or_default(),
        }
    }
}

/// What the service reports after a write or append.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateSummary {
    pub spreadsheet_id: Option<String>,
    /// For appends, the table the rows were appended after.
    pub table_range: Option<String>,
    pub updated_range: Option<String>,
    pub updated_rows: i32,
    pub updated_columns: i32,
    pub updated_cells: i32,
}

impl From<api::UpdateValuesResponse> for UpdateSummary {
    fn from(response: api::UpdateValuesResponse) -> Self {
        Self {
            spreadsheet_id: response.spreadsheet_id,
            table_range: None,
            updated_range: response.updated_range,
            updated_rows: response.updated_rows.unwrap_or_default(),
            updated_columns: response.updated_columns.unwrap_or_default(),
            updated_cells: response.updated_cells.unwrap_or_default(),
        }
    }
}

impl From<api::AppendValuesResponse> for UpdateSummary {
    fn from(response: api::AppendValuesResponse) -> Self {
        let mut summary = response.updates.map(UpdateSummary::from).unwrap_or_default();
        if response.spreadsheet_id.is_some() {
            summary.spreadsheet_id = response.spreadsheet_id;
        }
        summary.table_range = response.table_range;
        summary
    }
}

/// Read/write access to ranges of a spreadsheet.
///
/// Values are sent with `RAW` input semantics: strings are stored as given and
/// never parsed as formulas or numbers.
#[async_trait]
pub trait RangeOperations: Send + Sync {
    /// Fetch the values currently occupying `range`.
    async fn read(&self, spreadsheet_id: &str, range: &str) -> Result<ValueRange>;

    /// Overwrite cells starting at the top-left corner of `range`.
    async fn write(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<UpdateSummary>;

    /// Insert rows after the last row of the table found at `range`.
    async fn append(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<UpdateSummary>;

    async fn write_row(
        &self,
        spreadsheet_id: &str,
        range: &str,
        row: Vec<CellValue>,
    ) -> Result<UpdateSummary> {
        self.write(spreadsheet_id, range, vec![row]).await
    }

    async fn append_row(
        &self,
        spreadsheet_id: &str,
        range: &str,
        row: Vec<CellValue>,
    ) -> Result<UpdateSummary> {
        self.append(spreadsheet_id, range, vec![row]).await
    }
}
