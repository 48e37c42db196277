use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use super::{Backend, CellValue, Dialect, ResultRow, SqlParam, SqliteLocation, Statement};
use crate::error::DbError;

/// SQLite backend. Files are opened read-only so a mistyped path fails
/// instead of silently creating an empty database.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    pub fn open(location: &SqliteLocation) -> Result<Self, DbError> {
        let conn = match location {
            SqliteLocation::Memory => Connection::open_in_memory()?,
            SqliteLocation::File(path) => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
        };
        Self::from_connection(conn)
    }

    /// Wrap an already open connection.
    pub fn from_connection(conn: Connection) -> Result<Self, DbError> {
        ensure_math_functions(&conn)?;
        Ok(Self { conn })
    }

    fn run(&self, statement: &Statement) -> Result<Vec<ResultRow>, DbError> {
        let mut stmt = self.conn.prepare(statement.sql())?;
        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let params: Vec<Value> = statement
            .params()
            .iter()
            .map(|p| match p {
                SqlParam::Float(v) => Value::Real(*v),
                SqlParam::Int(v) => Value::Integer(*v),
                SqlParam::Text(v) => Value::Text(v.clone()),
            })
            .collect();

        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let values = (0..columns.len())
                .map(|i| row.get_ref(i).map(decode_value))
                .collect::<Result<Vec<_>, _>>()?;
            out.push(ResultRow::new(Arc::clone(&columns), values));
        }
        Ok(out)
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn fetch_all(&mut self, statement: &Statement) -> Result<Vec<ResultRow>, DbError> {
        self.run(statement)
    }
}

fn decode_value(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(i) => CellValue::Int(i),
        ValueRef::Real(f) => CellValue::Float(f),
        ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => CellValue::Bytes(b.to_vec()),
    }
}

/// The Haversine strategy needs `sin`, `cos`, `asin` and `sqrt`, which
/// SQLite only ships when compiled with SQLITE_ENABLE_MATH_FUNCTIONS.
fn ensure_math_functions(conn: &Connection) -> Result<(), DbError> {
    let probe = conn.query_row("SELECT asin(sqrt(sin(0.5) * cos(0.5)))", [], |_| Ok(()));
    if probe.is_ok() {
        return Ok(());
    }
    debug!("SQLite lacks math functions, registering replacements");
    register_math_functions(conn)?;
    Ok(())
}

pub(crate) fn register_math_functions(conn: &Connection) -> rusqlite::Result<()> {
    let functions: [(&str, fn(f64) -> f64); 4] = [
        ("sin", f64::sin),
        ("cos", f64::cos),
        ("asin", f64::asin),
        ("sqrt", f64::sqrt),
    ];
    for (name, func) in functions {
        conn.create_scalar_function(
            name,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            move |ctx| {
                let x: Option<f64> = ctx.get(0)?;
                Ok(x.map(func))
            },
        )?;
    }
    Ok(())
}
