/// USD amount stored in a ledger price cell.
///
/// Zero is the "absent" sentinel: an empty cell decodes to zero and zero
/// encodes back to an empty cell. No real quote is ever zero.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Price(f64);

impl Price {
    pub const ABSENT: Price = Price(0.0);

    pub fn new(value: f64) -> Result<Self, String> {
        if value.is_finite() {
            Ok(Price(value))
        } else {
            Err("Price must be finite".to_string())
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_absent(&self) -> bool {
        self.0 == 0.0
    }

    /// Lenient cell parse: anything that is not a finite decimal is absent.
    pub fn parse_lenient(raw: &str) -> Price {
        if raw.is_empty() {
            return Price::ABSENT;
        }
        raw.parse::<f64>()
            .ok()
            .and_then(|value| Price::new(value).ok())
            .unwrap_or(Price::ABSENT)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}
