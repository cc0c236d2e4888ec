use serde::{Serialize, Serializer};

/// One spreadsheet cell as exchanged with the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Null, missing or explicitly blank cell. Written back as "".
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) => f.write_str(text),
            Cell::Number(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Cell {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Cell::Empty,
            serde_json::Value::String(text) => Cell::Text(text),
            serde_json::Value::Number(number) => match number.as_f64() {
                Some(value) => Cell::Number(value),
                None => Cell::Text(number.to_string()),
            },
            serde_json::Value::Bool(flag) => Cell::Text(flag.to_string()),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Empty => serializer.serialize_str(""),
            Cell::Text(text) => serializer.serialize_str(text),
            Cell::Number(value) => serializer.serialize_f64(*value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_from_json() {
        assert_eq!(Cell::from(json!(null)), Cell::Empty);
        assert_eq!(Cell::from(json!("BTC")), Cell::Text("BTC".to_string()));
        assert_eq!(Cell::from(json!(45010)), Cell::Number(45010.0));
        assert_eq!(Cell::from(json!(true)), Cell::Text("true".to_string()));
    }

    #[test]
    fn test_cell_serializes_empty_as_blank_string() {
        let row = vec![Cell::Empty, Cell::from("UP"), Cell::Number(45000.5)];
        assert_eq!(serde_json::to_value(&row).unwrap(), json!(["", "UP", 45000.5]));
    }

    #[test]
    fn test_cell_is_blank() {
        assert!(Cell::Empty.is_blank());
        assert!(Cell::from("").is_blank());
        assert!(!Cell::from(" ").is_blank());
        assert!(!Cell::Number(0.0).is_blank());
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Empty.to_string(), "");
        assert_eq!(Cell::Number(45010.0).to_string(), "45010");
        assert_eq!(Cell::Number(45000.5).to_string(), "45000.5");
    }
}
