//! In-memory backend for unit tests that only need catalog answers or
//! want to inspect the statements the engine sends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{Backend, CellValue, Dialect, ResultRow, SqlParam, Statement};
use crate::error::DbError;

pub(crate) struct ScriptedBackend {
    dialect: Dialect,
    counts: HashMap<String, i64>,
    rows: Vec<ResultRow>,
    fail: bool,
    executed: Vec<Statement>,
}

impl ScriptedBackend {
    pub(crate) fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            counts: HashMap::new(),
            rows: Vec::new(),
            fail: false,
            executed: Vec::new(),
        }
    }

    /// Answer catalog lookups whose bound name is `name` with `count`.
    pub(crate) fn with_count(mut self, name: &str, count: i64) -> Self {
        self.counts.insert(name.to_string(), count);
        self
    }

    /// Rows returned for every non-catalog statement.
    pub(crate) fn with_rows(mut self, rows: Vec<ResultRow>) -> Self {
        self.rows = rows;
        self
    }

    pub(crate) fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub(crate) fn executed(&self) -> &[Statement] {
        &self.executed
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn fetch_all(&mut self, statement: &Statement) -> Result<Vec<ResultRow>, DbError> {
        self.executed.push(statement.clone());
        if self.fail {
            return Err(DbError::Timeout(Duration::from_secs(15)));
        }
        if statement.sql().contains("pg_catalog.") {
            let name = match statement.params().first() {
                Some(SqlParam::Text(name)) => name.as_str(),
                _ => "",
            };
            let count = self.counts.get(name).copied().unwrap_or(0);
            let columns: Arc<[String]> = vec!["n".to_string()].into();
            return Ok(vec![ResultRow::new(columns, vec![CellValue::Int(count)])]);
        }
        Ok(self.rows.clone())
    }
}
