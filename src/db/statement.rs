/// A value bound to a statement placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Float(f64),
    Int(i64),
    Text(String),
}

/// How a driver spells its placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ... (PostgreSQL)
    Numbered,
    /// `?` for every parameter (MySQL, SQLite)
    Positional,
}

impl PlaceholderStyle {
    /// Placeholder text for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            PlaceholderStyle::Numbered => format!("${index}"),
            PlaceholderStyle::Positional => String::from("?"),
        }
    }
}

/// SQL text plus its parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<SqlParam>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }
}
