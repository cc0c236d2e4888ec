//! Domain errors raised while turning ledger rows into price records.

use thiserror::Error;

/// A ledger row could not be turned into a price record.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RowDecodeError {
    #[error("invalid row: expected at least {expected} columns, got {found}")]
    TooFewCells { expected: usize, found: usize },
}

/// The Date and Time columns of a record do not form a known timestamp.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TimestampError {
    #[error("unable to parse date/time: {input}")]
    Unparsable { input: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_decode_error_display() {
        let error = RowDecodeError::TooFewCells {
            expected: 5,
            found: 3,
        };
        assert_eq!(
            error.to_string(),
            "invalid row: expected at least 5 columns, got 3"
        );
    }

    #[test]
    fn test_timestamp_error_display() {
        let error = TimestampError::Unparsable {
            input: "yesterday noon".to_string(),
        };
        assert_eq!(error.to_string(), "unable to parse date/time: yesterday noon");
    }
}
