//! Positional mapping between ledger rows (columns A..R) and price records.

use crate::domain::entities::cell::Cell;
use crate::domain::entities::price_record::{PriceOffset, PriceRecord};
use crate::domain::errors::RowDecodeError;
use crate::domain::value_objects::price::Price;

/// Columns A..R.
pub const RECORD_WIDTH: usize = 18;
/// Rows shorter than Date..Direction are rejected.
pub const MIN_ROW_WIDTH: usize = 5;

const SOURCE_PRICE_COLUMN: usize = 5;
const BYBIT_PRICE_COLUMN: usize = 6;
const FIRST_OFFSET_COLUMN: usize = 7;

pub fn decode_row(row: &[Cell]) -> Result<PriceRecord, RowDecodeError> {
    if row.len() < MIN_ROW_WIDTH {
        return Err(RowDecodeError::TooFewCells {
            expected: MIN_ROW_WIDTH,
            found: row.len(),
        });
    }

    let mut record = PriceRecord::new(
        &text_at(row, 0),
        &text_at(row, 1),
        &text_at(row, 2),
        &text_at(row, 3),
        &text_at(row, 4),
    );
    record.source_price = price_at(row, SOURCE_PRICE_COLUMN);
    record.bybit_price = price_at(row, BYBIT_PRICE_COLUMN);

    for offset in PriceOffset::ALL {
        record.set_offset_price(offset, price_at(row, FIRST_OFFSET_COLUMN + offset.index()));
    }

    Ok(record)
}

/// Always exactly [`RECORD_WIDTH`] cells; absent prices become blank cells.
pub fn encode_record(record: &PriceRecord) -> Vec<Cell> {
    let mut row = Vec::with_capacity(RECORD_WIDTH);
    row.push(Cell::Text(record.date.clone()));
    row.push(Cell::Text(record.time.clone()));
    row.push(Cell::Text(record.source.clone()));
    row.push(Cell::Text(record.coin.clone()));
    row.push(Cell::Text(record.direction.clone()));
    row.push(price_cell(record.source_price));
    row.push(price_cell(record.bybit_price));
    row.extend(record.offset_prices().map(|(_, price)| price_cell(price)));
    row
}

fn text_at(row: &[Cell], index: usize) -> String {
    row.get(index).map(Cell::to_string).unwrap_or_default()
}

fn price_at(row: &[Cell], index: usize) -> Price {
    match row.get(index) {
        None | Some(Cell::Empty) => Price::ABSENT,
        Some(Cell::Text(raw)) => Price::parse_lenient(raw),
        Some(Cell::Number(value)) => Price::new(*value).unwrap_or(Price::ABSENT),
    }
}

fn price_cell(price: Price) -> Cell {
    if price.is_absent() {
        Cell::Empty
    } else {
        Cell::Number(price.value())
    }
}
