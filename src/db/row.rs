use std::sync::Arc;

/// A single decoded cell, independent of the driver that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl CellValue {
    pub fn display(&self) -> String {
        match self {
            CellValue::Null => "NULL".to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Bytes(b) => format!("[{} bytes]", b.len()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric view of the cell. Text is parsed because some drivers hand
    /// back DECIMAL and computed columns as strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(f) => Some(*f),
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Text(s) => s.trim().parse().ok(),
            CellValue::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
            CellValue::Null => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(i) => Some(*i),
            CellValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            CellValue::Text(s) => s.trim().parse().ok(),
            CellValue::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text view of the cell; `None` for NULL.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            other => Some(other.display()),
        }
    }
}

/// One result row. Column names are shared by every row of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    columns: Arc<[String]>,
    values: Vec<CellValue>,
}

impl ResultRow {
    pub fn new(columns: Arc<[String]>, values: Vec<CellValue>) -> Self {
        Self { columns, values }
    }

    /// Look a cell up by column name (case-insensitive, MySQL may upper-case
    /// aliases depending on server settings).
    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|i| self.values.get(i))
    }
}
