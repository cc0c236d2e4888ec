//! Ledger Trait
//!
//! This module defines the `Ledger` trait, the spreadsheet operations the
//! enrichment run needs: read sheet metadata, read a range, clear a range and
//! overwrite a range. Values are written verbatim (no server-side coercion).

use crate::domain::entities::cell::Cell;
use async_trait::async_trait;
use thiserror::Error;

/// Common result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur while talking to the ledger backend
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    /// The request never got a response
    #[error("ledger request failed: {0}")]
    Request(String),

    /// The backend answered with a non-2xx status
    #[error("ledger API error {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape
    #[error("invalid ledger response: {0}")]
    Decode(String),

    /// Credentials were rejected or could not be exchanged for a token
    #[error("ledger authentication failed: {0}")]
    Auth(String),

    #[error("ledger call cancelled")]
    Cancelled,
}

/// One sheet (tab) of a spreadsheet
#[derive(Debug, Clone, PartialEq)]
pub struct SheetInfo {
    pub title: String,
    pub id: i64,
}

/// Spreadsheet title and its sheets in display order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpreadsheetMetadata {
    pub title: String,
    pub sheets: Vec<SheetInfo>,
}

impl SpreadsheetMetadata {
    pub fn first_sheet_title(&self) -> Option<&str> {
        self.sheets.first().map(|sheet| sheet.title.as_str())
    }
}

/// Ledger trait providing the spreadsheet operations used by enrichment
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Get the name of this ledger backend
    fn name(&self) -> &str;

    /// Title and sheet list of a spreadsheet
    async fn read_metadata(&self, spreadsheet_id: &str) -> LedgerResult<SpreadsheetMetadata>;

    /// Rows of an A1 range; trailing empty cells may be missing from a row
    async fn read_range(&self, spreadsheet_id: &str, range: &str) -> LedgerResult<Vec<Vec<Cell>>>;

    /// Clear the values of an A1 range
    async fn clear_range(&self, spreadsheet_id: &str, range: &str) -> LedgerResult<()>;

    /// Overwrite an A1 range with raw values
    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<Cell>>,
    ) -> LedgerResult<()>;
}
