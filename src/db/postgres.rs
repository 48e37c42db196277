use std::sync::Arc;

use async_trait::async_trait;
use postgres_native_tls::MakeTlsConnector;
use tokio::task::JoinHandle;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, Row};
use tracing::error;

use super::connection::CONNECT_TIMEOUT;
use super::{Backend, CellValue, Dialect, ResultRow, SqlParam, Statement, TlsOptions};
use crate::error::DbError;

pub struct PostgresBackend {
    client: Client,
    connection: JoinHandle<()>,
}

impl PostgresBackend {
    pub async fn connect(config: &tokio_postgres::Config, tls: &TlsOptions) -> Result<Self, DbError> {
        let tls = build_tls_connector(tls)?;
        let (client, connection) = tokio::time::timeout(CONNECT_TIMEOUT, config.connect(tls))
            .await
            .map_err(|_| DbError::Timeout(CONNECT_TIMEOUT))??;
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });
        Ok(Self { client, connection })
    }

    /// The underlying client, for callers that need to prepare data
    /// before handing the connection to a session.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Drop for PostgresBackend {
    fn drop(&mut self) {
        self.connection.abort();
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn fetch_all(&mut self, statement: &Statement) -> Result<Vec<ResultRow>, DbError> {
        let params: Vec<&(dyn ToSql + Sync)> = statement
            .params()
            .iter()
            .map(|p| match p {
                SqlParam::Float(v) => v as &(dyn ToSql + Sync),
                SqlParam::Int(v) => v as &(dyn ToSql + Sync),
                SqlParam::Text(v) => v as &(dyn ToSql + Sync),
            })
            .collect();
        let rows = self.client.query(statement.sql(), &params).await?;
        Ok(decode_rows(&rows))
    }
}

/// Build a TLS connector. Whether TLS is actually negotiated is governed by
/// the `sslmode` of the connection config (`prefer` by default).
fn build_tls_connector(options: &TlsOptions) -> Result<MakeTlsConnector, DbError> {
    let mut builder = native_tls::TlsConnector::builder();

    if options.accept_invalid_certs {
        builder.danger_accept_invalid_certs(true);
        builder.danger_accept_invalid_hostnames(true);
    } else if let Some(path) = &options.ca_cert_path {
        let pem = std::fs::read(path).map_err(|source| DbError::CaCertificate {
            path: path.clone(),
            source,
        })?;
        builder.add_root_certificate(native_tls::Certificate::from_pem(&pem)?);
    }

    Ok(MakeTlsConnector::new(builder.build()?))
}

fn decode_rows(rows: &[Row]) -> Vec<ResultRow> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let columns: Arc<[String]> = first
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    rows.iter()
        .map(|row| {
            let values = row
                .columns()
                .iter()
                .enumerate()
                .map(|(i, col)| extract_value(row, i, col.type_()))
                .collect();
            ResultRow::new(Arc::clone(&columns), values)
        })
        .collect()
}

fn extract_value(row: &Row, idx: usize, pg_type: &Type) -> CellValue {
    match *pg_type {
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)
            .ok()
            .flatten()
            .map(|v| CellValue::Int(i64::from(v)))
            .unwrap_or(CellValue::Null),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)
            .ok()
            .flatten()
            .map(|v| CellValue::Int(i64::from(v)))
            .unwrap_or(CellValue::Null),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Int)
            .unwrap_or(CellValue::Null),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)
            .ok()
            .flatten()
            .map(|v| CellValue::Float(f64::from(v)))
            .unwrap_or(CellValue::Null),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Float)
            .unwrap_or(CellValue::Null),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Bytes)
            .unwrap_or(CellValue::Null),
        _ => {
            // TEXT, VARCHAR, BPCHAR, NAME and anything else that decodes as a string
            row.try_get::<_, Option<String>>(idx)
                .ok()
                .flatten()
                .map(CellValue::Text)
                .unwrap_or(CellValue::Null)
        }
    }
}
