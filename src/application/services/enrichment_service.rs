//! Enrichment run
//!
//! One pass over the ledger: read every data row, fill the prices that have
//! come due from the oracle, then rewrite the data area (A2:R) with the
//! surviving records.

use crate::domain::entities::cell::Cell;
use crate::domain::entities::price_record::{PriceOffset, PriceRecord};
use crate::domain::repositories::ledger::{Ledger, LedgerError, SpreadsheetMetadata};
use crate::domain::repositories::price_oracle::{OracleError, PriceOracle};
use crate::domain::services::row_codec::{decode_row, encode_record};
use crate::domain::services::temporal_policy::is_due;
use crate::domain::value_objects::price::Price;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Spreadsheet row of the first data record (row 1 holds headers)
pub const FIRST_DATA_ROW: usize = 2;

/// Last column written back
const LAST_COLUMN: &str = "R";

/// Errors that abort an enrichment run
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("failed to read spreadsheet: {0}")]
    LedgerRead(LedgerError),

    #[error("no sheets found in spreadsheet")]
    NoSheets,

    #[error("failed to write data: {0}")]
    LedgerWrite(LedgerError),

    #[error("enrichment cancelled")]
    Cancelled,
}

impl EnrichmentError {
    /// False only for operator cancellation.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EnrichmentError::Cancelled)
    }

    fn read(err: LedgerError) -> Self {
        match err {
            LedgerError::Cancelled => EnrichmentError::Cancelled,
            other => EnrichmentError::LedgerRead(other),
        }
    }

    fn write(err: LedgerError) -> Self {
        match err {
            LedgerError::Cancelled => EnrichmentError::Cancelled,
            other => EnrichmentError::LedgerWrite(other),
        }
    }
}

/// Which spreadsheet and range a run works on
#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub spreadsheet_id: String,
    /// A1 range to read; empty means the whole first sheet
    pub range: String,
}

/// Outcome of the fill phase
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillSummary {
    pub missing_prices: usize,
    pub prices_updated: usize,
    pub price_errors: Vec<String>,
    /// Records whose offset checks were skipped for an unparsable Date/Time
    pub timestamp_skipped: usize,
}

/// Outcome of a complete run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentReport {
    pub rows_read: usize,
    pub records_decoded: usize,
    pub parse_errors: Vec<String>,
    pub missing_prices: usize,
    pub prices_updated: usize,
    pub price_errors: Vec<String>,
    pub timestamp_skipped: usize,
    pub clear_failed: bool,
    pub rows_written: usize,
    pub write_range: Option<String>,
}

impl EnrichmentReport {
    fn absorb(&mut self, fill: FillSummary) {
        self.missing_prices = fill.missing_prices;
        self.prices_updated = fill.prices_updated;
        self.price_errors = fill.price_errors;
        self.timestamp_skipped = fill.timestamp_skipped;
    }
}

/// Sheet the data area is rewritten on.
///
/// Takes the part of `read_range` before `!`. When that is empty, or the range
/// has no `!` at all, the first sheet of the spreadsheet is used instead.
pub fn write_sheet_name(read_range: &str, metadata: &SpreadsheetMetadata) -> String {
    let sheet = match read_range.find('!') {
        Some(idx) => &read_range[..idx],
        None => read_range,
    };

    if sheet.is_empty() || sheet == read_range {
        if let Some(first) = metadata.first_sheet_title() {
            return first.to_string();
        }
    }

    sheet.to_string()
}

/// Orchestrates one read → fill → write cycle
pub struct EnrichmentService {
    ledger: Arc<dyn Ledger>,
    oracle: Arc<dyn PriceOracle>,
    settings: EnrichmentSettings,
    cancel: CancellationToken,
}

impl EnrichmentService {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        oracle: Arc<dyn PriceOracle>,
        settings: EnrichmentSettings,
    ) -> Self {
        Self {
            ledger,
            oracle,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between steps once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn ensure_active(&self) -> Result<(), EnrichmentError> {
        if self.cancel.is_cancelled() {
            return Err(EnrichmentError::Cancelled);
        }
        Ok(())
    }

    pub async fn process(&self) -> Result<EnrichmentReport, EnrichmentError> {
        let spreadsheet_id = self.settings.spreadsheet_id.as_str();
        let mut report = EnrichmentReport::default();

        info!(
            "Reading spreadsheet {} via {}",
            spreadsheet_id,
            self.ledger.name()
        );

        self.ensure_active()?;
        let metadata = self
            .ledger
            .read_metadata(spreadsheet_id)
            .await
            .map_err(EnrichmentError::read)?;

        info!("Spreadsheet title: {}", metadata.title);
        info!("Available sheets: {}", metadata.sheets.len());
        for (i, sheet) in metadata.sheets.iter().enumerate() {
            info!("  Sheet {}: {} (ID: {})", i + 1, sheet.title, sheet.id);
        }

        let read_range = if !self.settings.range.is_empty() {
            self.settings.range.clone()
        } else {
            metadata
                .first_sheet_title()
                .map(str::to_string)
                .ok_or(EnrichmentError::NoSheets)?
        };
        info!("Reading range: {}", read_range);

        self.ensure_active()?;
        let rows = self
            .ledger
            .read_range(spreadsheet_id, &read_range)
            .await
            .map_err(EnrichmentError::read)?;
        report.rows_read = rows.len();

        if rows.is_empty() {
            info!("No data found in spreadsheet");
            return Ok(report);
        }
        info!("Found {} rows", rows.len());

        if rows.len() < FIRST_DATA_ROW {
            info!("No data rows found (only headers)");
            return Ok(report);
        }

        let headers: Vec<String> = rows[0].iter().map(Cell::to_string).collect();
        debug!("Headers: {}", headers.join(", "));

        let mut records = Vec::with_capacity(rows.len() - 1);
        for (i, row) in rows.iter().skip(1).enumerate() {
            let row_number = i + FIRST_DATA_ROW;
            match decode_row(row) {
                Ok(record) => {
                    debug!("Row {}: {}", row_number, record);
                    records.push(record);
                }
                Err(e) => {
                    let message = format!("Row {}: parse error: {}", row_number, e);
                    warn!("{}", message);
                    report.parse_errors.push(message);
                }
            }
        }
        report.records_decoded = records.len();

        info!("Successfully parsed: {} records", records.len());
        if !report.parse_errors.is_empty() {
            info!("Parse errors: {}", report.parse_errors.len());
        }

        let fill = self.fill_missing_prices(&mut records, Utc::now()).await?;
        report.absorb(fill);

        self.write_back(&metadata, &records, &read_range, &mut report)
            .await?;

        info!("✅ Process completed successfully");
        Ok(report)
    }

    /// Outer error aborts the run, inner error is a failed lookup.
    async fn fetch_price(&self, coin: &str) -> Result<Result<Price, String>, EnrichmentError> {
        self.ensure_active()?;
        match self.oracle.fetch_price_usd(coin).await {
            Ok(value) => Ok(Price::new(value)),
            Err(OracleError::Cancelled) => Err(EnrichmentError::Cancelled),
            Err(e) => Ok(Err(e.to_string())),
        }
    }

    /// Fill the Bybit price and every due offset column of `records` as of `now`.
    ///
    /// Lookup failures are collected in the summary and leave the cell absent.
    /// Only cancellation aborts the phase.
    pub async fn fill_missing_prices(
        &self,
        records: &mut [PriceRecord],
        now: DateTime<Utc>,
    ) -> Result<FillSummary, EnrichmentError> {
        info!("Checking and filling missing prices...");
        let mut summary = FillSummary::default();

        for (i, record) in records.iter_mut().enumerate() {
            if record.coin.is_empty() {
                continue;
            }

            let record_number = i + 1;
            let mut missing = 0;
            let mut updated = 0;

            if record.bybit_price.is_absent() {
                missing += 1;
                info!(
                    "Record {} ({}): Missing Bybit price, fetching from {}...",
                    record_number,
                    record.coin,
                    self.oracle.name()
                );

                match self.fetch_price(&record.coin).await? {
                    Ok(price) => {
                        record.bybit_price = price;
                        updated += 1;
                        info!("  ✅ Updated Bybit price: {}", price);
                    }
                    Err(e) => {
                        let message = format!(
                            "Record {} ({}): failed to get Bybit price: {}",
                            record_number, record.coin, e
                        );
                        error!("  ❌ {}", message);
                        summary.price_errors.push(message);
                    }
                }
            }

            for offset in PriceOffset::ALL {
                let due = match is_due(record, offset, now) {
                    Ok(due) => due,
                    Err(e) => {
                        // Every offset shares the same anchor
                        warn!(
                            "Record {} ({}): skipping offset checks: {}",
                            record_number, record.coin, e
                        );
                        summary.timestamp_skipped += 1;
                        break;
                    }
                };

                if !due {
                    continue;
                }

                missing += 1;
                info!(
                    "Record {} ({}): Missing {}, fetching from {}...",
                    record_number,
                    record.coin,
                    offset,
                    self.oracle.name()
                );

                match self.fetch_price(&record.coin).await? {
                    Ok(price) => {
                        record.set_offset_price(offset, price);
                        updated += 1;
                        info!("  ✅ Updated {}: {}", offset, price);
                    }
                    Err(e) => {
                        let message = format!(
                            "Record {} ({}): failed to get {}: {}",
                            record_number, record.coin, offset, e
                        );
                        error!("  ❌ {}", message);
                        summary.price_errors.push(message);
                    }
                }
            }

            if missing > 0 {
                info!(
                    "Record {} ({}): filled {}/{} missing prices",
                    record_number, record.coin, updated, missing
                );
            }

            summary.missing_prices += missing;
            summary.prices_updated += updated;
        }

        info!("Price filling summary:");
        info!("Total missing prices found: {}", summary.missing_prices);
        info!("Successfully updated: {}", summary.prices_updated);
        if !summary.price_errors.is_empty() {
            info!("Failed to update: {}", summary.price_errors.len());
            for message in &summary.price_errors {
                info!("  - {}", message);
            }
        }

        Ok(summary)
    }

    async fn write_back(
        &self,
        metadata: &SpreadsheetMetadata,
        records: &[PriceRecord],
        read_range: &str,
        report: &mut EnrichmentReport,
    ) -> Result<(), EnrichmentError> {
        info!("Updating ledger with new data...");

        if records.is_empty() {
            info!("No records to update");
            return Ok(());
        }

        let values: Vec<Vec<Cell>> = records.iter().map(encode_record).collect();

        let sheet_name = write_sheet_name(read_range, metadata);
        let last_row = FIRST_DATA_ROW + values.len() - 1;
        let write_range = format!(
            "{}!A{}:{}{}",
            sheet_name, FIRST_DATA_ROW, LAST_COLUMN, last_row
        );
        let clear_range = format!("{}!A{}:{}", sheet_name, FIRST_DATA_ROW, LAST_COLUMN);

        info!("Sheet name: {}", sheet_name);
        info!(
            "Writing {} records to range: {} (rows {}-{})",
            records.len(),
            write_range,
            FIRST_DATA_ROW,
            last_row
        );

        info!("Clearing old data in range: {}", clear_range);
        self.ensure_active()?;
        match self
            .ledger
            .clear_range(&self.settings.spreadsheet_id, &clear_range)
            .await
        {
            Ok(()) => {}
            Err(LedgerError::Cancelled) => return Err(EnrichmentError::Cancelled),
            Err(e) => {
                warn!("⚠️  Failed to clear old data: {}", e);
                report.clear_failed = true;
            }
        }

        let rows = values.len();
        self.ensure_active()?;
        self.ledger
            .write_range(&self.settings.spreadsheet_id, &write_range, values)
            .await
            .map_err(EnrichmentError::write)?;

        info!("✅ Updated {} rows in spreadsheet", rows);
        report.rows_written = rows;
        report.write_range = Some(write_range);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::ledger::SheetInfo;

    fn metadata(titles: &[&str]) -> SpreadsheetMetadata {
        SpreadsheetMetadata {
            title: "Signals".to_string(),
            sheets: titles
                .iter()
                .enumerate()
                .map(|(i, title)| SheetInfo {
                    title: title.to_string(),
                    id: i as i64,
                })
                .collect(),
        }
    }

    #[test]
    fn test_sheet_name_from_qualified_range() {
        let meta = metadata(&["Tracking", "Archive"]);
        assert_eq!(write_sheet_name("Archive!A1:R", &meta), "Archive");
    }

    #[test]
    fn test_bare_sheet_name_uses_first_sheet() {
        let meta = metadata(&["Tracking", "Archive"]);
        assert_eq!(write_sheet_name("Archive", &meta), "Tracking");
        assert_eq!(write_sheet_name("Tracking", &meta), "Tracking");
    }

    #[test]
    fn test_empty_sheet_part_uses_first_sheet() {
        let meta = metadata(&["Tracking"]);
        assert_eq!(write_sheet_name("!A1:R", &meta), "Tracking");
        assert_eq!(write_sheet_name("", &meta), "Tracking");
    }

    #[test]
    fn test_no_sheets_keeps_parsed_name() {
        let meta = metadata(&[]);
        assert_eq!(write_sheet_name("Data!A:R", &meta), "Data");
        assert_eq!(write_sheet_name("Data", &meta), "Data");
    }

    #[test]
    fn test_error_classification() {
        assert!(EnrichmentError::NoSheets.is_fatal());
        assert!(!EnrichmentError::Cancelled.is_fatal());
        assert!(matches!(
            EnrichmentError::read(LedgerError::Cancelled),
            EnrichmentError::Cancelled
        ));
        assert!(matches!(
            EnrichmentError::write(LedgerError::Request("reset".to_string())),
            EnrichmentError::LedgerWrite(_)
        ));
    }
}
