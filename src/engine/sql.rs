use crate::db::{PlaceholderStyle, SqlParam, Statement};

/// Accumulates SQL text and its bound parameters side by side.
///
/// A parameter can only be added through [`SqlBuilder::push_param`], which
/// writes its placeholder at the current position, so the text and the
/// parameter list cannot drift apart.
#[derive(Debug)]
pub struct SqlBuilder {
    style: PlaceholderStyle,
    sql: String,
    params: Vec<SqlParam>,
}

impl SqlBuilder {
    pub fn new(style: PlaceholderStyle) -> Self {
        Self {
            style,
            sql: String::with_capacity(1024),
            params: Vec::new(),
        }
    }

    /// Append engine-generated SQL. Never pass request data here.
    pub fn push_sql(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append a placeholder and bind `param` to it.
    ///
    /// Numbered (PostgreSQL) placeholders carry an explicit cast for numeric
    /// values so the server does not infer `real` or `integer` from the
    /// surrounding expression. Text is left uncast so comparisons against
    /// `char(2)` columns keep using their index.
    pub fn push_param(&mut self, param: SqlParam) -> &mut Self {
        self.params.push(param);
        let index = self.params.len();
        self.sql.push_str(&self.style.placeholder(index));
        if self.style == PlaceholderStyle::Numbered {
            match self.params[index - 1] {
                SqlParam::Float(_) => self.sql.push_str("::float8"),
                SqlParam::Int(_) => self.sql.push_str("::int8"),
                SqlParam::Text(_) => {}
            }
        }
        self
    }

    pub fn push_float(&mut self, value: f64) -> &mut Self {
        self.push_param(SqlParam::Float(value))
    }

    pub fn finish(self) -> Statement {
        Statement::new(self.sql, self.params)
    }
}
