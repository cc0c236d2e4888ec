use crate::domain::entities::price_record::{PriceOffset, PriceRecord};
use crate::domain::errors::TimestampError;
use chrono::{DateTime, Utc};

/// Whether the `offset` column of `record` should be fetched at `now`.
///
/// A filled column is never due. Otherwise the column is due once
/// `anchor + offset` has been reached (inclusive). An unparsable anchor is
/// reported as an error so the caller can log it and skip the record.
pub fn is_due(
    record: &PriceRecord,
    offset: PriceOffset,
    now: DateTime<Utc>,
) -> Result<bool, TimestampError> {
    if !record.offset_price(offset).is_absent() {
        return Ok(false);
    }

    let target = record
        .anchor_time()?
        .checked_add_signed(offset.duration())
        .ok_or_else(|| TimestampError::Unparsable {
            input: record.date_time(),
        })?;
    Ok(now >= target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::price::Price;
    use chrono::{Duration, FixedOffset, TimeZone};

    fn at_plus7(day: u32, h: u32, m: u32, s: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 12, day, h, m, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn record() -> PriceRecord {
        PriceRecord::new("29.12.2025", "10:00:00", "Binance", "BTC", "UP")
    }

    #[test]
    fn test_due_exactly_at_boundary() {
        let result = is_due(&record(), PriceOffset::TenMinutes, at_plus7(29, 10, 10, 0));
        assert_eq!(result, Ok(true));
    }

    #[test]
    fn test_not_due_one_second_before() {
        let result = is_due(&record(), PriceOffset::TenMinutes, at_plus7(29, 10, 9, 59));
        assert_eq!(result, Ok(false));
    }

    #[test]
    fn test_filled_column_is_never_due() {
        let mut record = record();
        record.set_offset_price(PriceOffset::TenMinutes, Price::new(45100.0).unwrap());

        for now in [at_plus7(29, 10, 0, 0), at_plus7(29, 10, 10, 0), at_plus7(31, 0, 0, 0)] {
            assert_eq!(is_due(&record, PriceOffset::TenMinutes, now), Ok(false));
        }
    }

    #[test]
    fn test_filled_column_skips_timestamp_parse() {
        let mut record = PriceRecord::new("someday", "", "", "BTC", "");
        record.set_offset_price(PriceOffset::OneHour, Price::new(1.0).unwrap());

        assert_eq!(is_due(&record, PriceOffset::OneHour, Utc::now()), Ok(false));
        assert!(is_due(&record, PriceOffset::TwoHours, Utc::now()).is_err());
    }

    #[test]
    fn test_due_is_monotone_in_time() {
        let record = record();
        let start = at_plus7(29, 9, 0, 0);

        for offset in PriceOffset::ALL {
            let mut seen_due = false;
            for step in 0..200 {
                let now = start + Duration::hours(4 * step);
                let due = is_due(&record, offset, now).unwrap();
                assert!(!(seen_due && !due), "{} flipped back at step {}", offset, step);
                seen_due |= due;
            }
            assert!(seen_due, "{} never became due", offset);
        }
    }

    #[test]
    fn test_one_month_uses_thirty_days() {
        let record = record();
        let thirty_days_later = at_plus7(29, 10, 0, 0) + Duration::days(30);

        assert_eq!(
            is_due(&record, PriceOffset::OneMonth, thirty_days_later - Duration::seconds(1)),
            Ok(false)
        );
        assert_eq!(is_due(&record, PriceOffset::OneMonth, thirty_days_later), Ok(true));
    }

    #[test]
    fn test_unparsable_anchor_is_an_error() {
        let record = PriceRecord::new("29.12.2025", "ten thirty", "", "BTC", "");
        assert_eq!(
            is_due(&record, PriceOffset::TenMinutes, Utc::now()),
            Err(TimestampError::Unparsable {
                input: "29.12.2025 ten thirty".to_string()
            })
        );
    }

    #[test]
    fn test_out_of_range_years_are_errors() {
        let now = at_plus7(29, 12, 0, 0);
        for date in ["31.12.+262142", "+262142-12-31"] {
            let record = PriceRecord::new(date, "23:00", "", "BTC", "");
            for offset in PriceOffset::ALL {
                assert_eq!(
                    is_due(&record, offset, now),
                    Err(TimestampError::Unparsable {
                        input: format!("{} 23:00", date)
                    })
                );
            }
        }
    }

    #[test]
    fn test_latest_four_digit_year_is_never_due() {
        let record = PriceRecord::new("31.12.9999", "23:59:59", "", "BTC", "");
        for offset in PriceOffset::ALL {
            assert_eq!(is_due(&record, offset, at_plus7(29, 12, 0, 0)), Ok(false));
        }
    }
}
