//! Price record entity
//!
//! One ledger row: when and where a coin was observed, its anchor price, and
//! eleven follow-up prices taken at fixed offsets after the observation.

use crate::domain::errors::TimestampError;
use crate::domain::value_objects::price::Price;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

/// Ledger timestamps are written in UTC+07:00.
pub const ANCHOR_UTC_OFFSET_HOURS: i64 = 7;

/// Accepted Date+Time layouts, tried in order. Each chrono format is paired
/// with the exact shape the input must have (`9` stands for one ASCII digit).
pub const TIMESTAMP_FORMATS: [(&str, &str); 4] = [
    ("%d.%m.%Y %H:%M:%S", "99.99.9999 99:99:99"),
    ("%d.%m.%Y %H:%M", "99.99.9999 99:99"),
    ("%Y-%m-%d %H:%M:%S", "9999-99-99 99:99:99"),
    ("%Y-%m-%d %H:%M", "9999-99-99 99:99"),
];

// chrono's own parser is looser than the ledger layouts.
fn has_shape(input: &str, shape: &str) -> bool {
    input.len() == shape.len()
        && input.bytes().zip(shape.bytes()).all(|(c, s)| match s {
            b'9' => c.is_ascii_digit(),
            _ => c == s,
        })
}

/// Follow-up price columns, in ledger column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceOffset {
    TenMinutes,
    ThirtyMinutes,
    OneHour,
    TwoHours,
    SixHours,
    TwelveHours,
    TwentyFourHours,
    ThreeDays,
    FiveDays,
    SevenDays,
    OneMonth,
}

impl PriceOffset {
    pub const COUNT: usize = 11;

    pub const ALL: [PriceOffset; PriceOffset::COUNT] = [
        PriceOffset::TenMinutes,
        PriceOffset::ThirtyMinutes,
        PriceOffset::OneHour,
        PriceOffset::TwoHours,
        PriceOffset::SixHours,
        PriceOffset::TwelveHours,
        PriceOffset::TwentyFourHours,
        PriceOffset::ThreeDays,
        PriceOffset::FiveDays,
        PriceOffset::SevenDays,
        PriceOffset::OneMonth,
    ];

    pub fn index(&self) -> usize {
        match self {
            PriceOffset::TenMinutes => 0,
            PriceOffset::ThirtyMinutes => 1,
            PriceOffset::OneHour => 2,
            PriceOffset::TwoHours => 3,
            PriceOffset::SixHours => 4,
            PriceOffset::TwelveHours => 5,
            PriceOffset::TwentyFourHours => 6,
            PriceOffset::ThreeDays => 7,
            PriceOffset::FiveDays => 8,
            PriceOffset::SevenDays => 9,
            PriceOffset::OneMonth => 10,
        }
    }

    /// Time between the anchor and the moment this column becomes due.
    /// A "month" is a flat 30 days.
    pub fn duration(&self) -> Duration {
        match self {
            PriceOffset::TenMinutes => Duration::minutes(10),
            PriceOffset::ThirtyMinutes => Duration::minutes(30),
            PriceOffset::OneHour => Duration::hours(1),
            PriceOffset::TwoHours => Duration::hours(2),
            PriceOffset::SixHours => Duration::hours(6),
            PriceOffset::TwelveHours => Duration::hours(12),
            PriceOffset::TwentyFourHours => Duration::hours(24),
            PriceOffset::ThreeDays => Duration::hours(3 * 24),
            PriceOffset::FiveDays => Duration::hours(5 * 24),
            PriceOffset::SevenDays => Duration::hours(7 * 24),
            PriceOffset::OneMonth => Duration::hours(30 * 24),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PriceOffset::TenMinutes => "Price10Min",
            PriceOffset::ThirtyMinutes => "Price30Min",
            PriceOffset::OneHour => "Price1Hour",
            PriceOffset::TwoHours => "Price2Hours",
            PriceOffset::SixHours => "Price6Hours",
            PriceOffset::TwelveHours => "Price12Hours",
            PriceOffset::TwentyFourHours => "Price24Hours",
            PriceOffset::ThreeDays => "Price3Days",
            PriceOffset::FiveDays => "Price5Days",
            PriceOffset::SevenDays => "Price7Days",
            PriceOffset::OneMonth => "Price1Month",
        }
    }
}

impl std::fmt::Display for PriceOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceRecord {
    pub date: String,
    pub time: String,
    pub source: String,
    pub coin: String,
    pub direction: String,
    pub source_price: Price,
    /// Anchor price, filled from the oracle when missing.
    pub bybit_price: Price,
    offset_prices: [Price; PriceOffset::COUNT],
}

impl PriceRecord {
    pub fn new(date: &str, time: &str, source: &str, coin: &str, direction: &str) -> Self {
        Self {
            date: date.to_string(),
            time: time.to_string(),
            source: source.to_string(),
            coin: coin.to_string(),
            direction: direction.to_string(),
            ..Default::default()
        }
    }

    pub fn offset_price(&self, offset: PriceOffset) -> Price {
        self.offset_prices[offset.index()]
    }

    pub fn set_offset_price(&mut self, offset: PriceOffset, price: Price) {
        self.offset_prices[offset.index()] = price;
    }

    /// Offset prices paired with their offsets, in column order.
    pub fn offset_prices(&self) -> impl Iterator<Item = (PriceOffset, Price)> + '_ {
        PriceOffset::ALL
            .iter()
            .map(move |offset| (*offset, self.offset_price(*offset)))
    }

    /// "Date Time", the raw text the anchor is parsed from.
    pub fn date_time(&self) -> String {
        format!("{} {}", self.date, self.time)
    }

    /// Observation instant, reading Date+Time as UTC+07:00 wall time.
    pub fn anchor_time(&self) -> Result<DateTime<Utc>, TimestampError> {
        let input = self.date_time();

        TIMESTAMP_FORMATS
            .iter()
            .filter(|(_, shape)| has_shape(&input, shape))
            .find_map(|(format, _)| NaiveDateTime::parse_from_str(&input, format).ok())
            .and_then(|local| local.checked_sub_signed(Duration::hours(ANCHOR_UTC_OFFSET_HOURS)))
            .map(|utc| Utc.from_utc_datetime(&utc))
            .ok_or(TimestampError::Unparsable { input })
    }
}

impl std::fmt::Display for PriceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Date: {}, Time: {}, Source: {}, Coin: {}, Direction: {}, SourcePrice: {:.2}, BybitPrice: {:.2}",
            self.date,
            self.time,
            self.source,
            self.coin,
            self.direction,
            self.source_price.value(),
            self.bybit_price.value()
        )
    }
}
