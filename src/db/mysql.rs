use std::sync::Arc;

use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, DriverError, Opts, Params, Row, Value};

use super::connection::CONNECT_TIMEOUT;
use super::{Backend, CellValue, Dialect, ResultRow, SqlParam, Statement};
use crate::error::DbError;

pub struct MySqlBackend {
    conn: Option<Conn>,
}

impl MySqlBackend {
    pub async fn connect(opts: &Opts) -> Result<Self, DbError> {
        let conn = tokio::time::timeout(CONNECT_TIMEOUT, Conn::new(opts.clone()))
            .await
            .map_err(|_| DbError::Timeout(CONNECT_TIMEOUT))??;
        Ok(Self { conn: Some(conn) })
    }
}

#[async_trait]
impl Backend for MySqlBackend {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn fetch_all(&mut self, statement: &Statement) -> Result<Vec<ResultRow>, DbError> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| DbError::MySql(DriverError::ConnectionClosed.into()))?;
        let rows: Vec<Row> = conn.exec(statement.sql(), to_params(statement.params())).await?;
        Ok(decode_rows(&rows))
    }

    async fn close(&mut self) -> Result<(), DbError> {
        if let Some(conn) = self.conn.take() {
            conn.disconnect().await?;
        }
        Ok(())
    }
}

fn to_params(params: &[SqlParam]) -> Params {
    if params.is_empty() {
        return Params::Empty;
    }
    Params::Positional(
        params
            .iter()
            .map(|p| match p {
                SqlParam::Float(v) => Value::Double(*v),
                SqlParam::Int(v) => Value::Int(*v),
                SqlParam::Text(v) => Value::Bytes(v.clone().into_bytes()),
            })
            .collect(),
    )
}

fn decode_rows(rows: &[Row]) -> Vec<ResultRow> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let columns: Arc<[String]> = first
        .columns_ref()
        .iter()
        .map(|c| c.name_str().into_owned())
        .collect();

    rows.iter()
        .map(|row| {
            let values = (0..row.len())
                .map(|i| row.as_ref(i).map_or(CellValue::Null, decode_value))
                .collect();
            ResultRow::new(Arc::clone(&columns), values)
        })
        .collect()
}

fn decode_value(value: &Value) -> CellValue {
    match value {
        Value::NULL => CellValue::Null,
        Value::Int(i) => CellValue::Int(*i),
        Value::UInt(u) => i64::try_from(*u).map_or(CellValue::Float(*u as f64), CellValue::Int),
        Value::Float(f) => CellValue::Float(f64::from(*f)),
        Value::Double(d) => CellValue::Float(*d),
        Value::Bytes(bytes) => match String::from_utf8(bytes.clone()) {
            Ok(text) => CellValue::Text(text),
            Err(e) => CellValue::Bytes(e.into_bytes()),
        },
        // DATE/TIME values never appear in our result sets; keep them readable anyway
        other => CellValue::Text(other.as_sql(true)),
    }
}
