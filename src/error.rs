use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Broad classification of a driver failure, used to give the user a hint
/// about what went wrong without exposing driver-specific codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Syntax errors (SQLSTATE 42601 and friends)
    Syntax,
    /// Missing table/column, unknown function, ambiguous reference
    Semantic,
    /// Runtime errors raised while the statement executed
    Execution,
    /// Connection/communication errors
    Connection,
    /// Anything we could not classify
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Syntax => write!(f, "syntax error"),
            ErrorCategory::Semantic => write!(f, "semantic error"),
            ErrorCategory::Execution => write!(f, "execution error"),
            ErrorCategory::Connection => write!(f, "connection error"),
            ErrorCategory::Unknown => write!(f, "error"),
        }
    }
}

impl ErrorCategory {
    /// A short remediation hint, if we have one for this category.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ErrorCategory::Semantic => Some(
                "check that the postalcodes and geoname tables are loaded and that \
                 the spatial extension in use is installed",
            ),
            ErrorCategory::Connection => Some("check the connection URL and that the server is reachable"),
            _ => None,
        }
    }
}

/// Errors raised by the database drivers.
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),
    #[error(transparent)]
    MySql(#[from] mysql_async::Error),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("connection timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("failed to read CA certificate {}: {source}", path.display())]
    CaCertificate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DbError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DbError::Postgres(err) => match err.code() {
                Some(state) => categorize_sqlstate(state.code()),
                None if err.is_closed() => ErrorCategory::Connection,
                None => ErrorCategory::Unknown,
            },
            DbError::MySql(mysql_async::Error::Server(server)) => categorize_sqlstate(&server.state),
            DbError::MySql(mysql_async::Error::Io(_)) | DbError::MySql(mysql_async::Error::Driver(_)) => {
                ErrorCategory::Connection
            }
            DbError::MySql(_) => ErrorCategory::Unknown,
            DbError::Sqlite(err) => categorize_sqlite(err),
            DbError::Tls(_) | DbError::Timeout(_) | DbError::CaCertificate { .. } => {
                ErrorCategory::Connection
            }
        }
    }
}

/// Categorize a SQLSTATE code. MySQL reports the same five-character
/// states for its server errors, so both drivers share this table.
fn categorize_sqlstate(code: &str) -> ErrorCategory {
    let Some(class) = code.get(..2) else {
        return ErrorCategory::Unknown;
    };
    match class {
        // Class 42: Syntax Error or Access Rule Violation
        "42" => {
            if code == "42601" || code == "42000" {
                ErrorCategory::Syntax
            } else {
                // 42P01 = undefined_table, 42883 = undefined_function, 42S02 (MySQL)
                ErrorCategory::Semantic
            }
        }
        "22" | "23" | "53" | "54" | "55" | "57" => ErrorCategory::Execution,
        "08" => ErrorCategory::Connection,
        _ => ErrorCategory::Unknown,
    }
}

fn categorize_sqlite(err: &rusqlite::Error) -> ErrorCategory {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            if message.starts_with("no such") {
                ErrorCategory::Semantic
            } else if message.contains("syntax error") {
                ErrorCategory::Syntax
            } else {
                ErrorCategory::Execution
            }
        }
        rusqlite::Error::SqliteFailure(code, None) => match code.code {
            rusqlite::ErrorCode::CannotOpen | rusqlite::ErrorCode::NotADatabase => {
                ErrorCategory::Connection
            }
            _ => ErrorCategory::Execution,
        },
        _ => ErrorCategory::Unknown,
    }
}

/// Top-level error type of the engine.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("failed to read config file {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("failed to connect to {target}")]
    Connect {
        target: String,
        #[source]
        source: DbError,
    },
    #[error("{operation} failed ({category})")]
    Query {
        operation: &'static str,
        category: ErrorCategory,
        #[source]
        source: DbError,
    },
    #[error("{operation}: column `{column}` {problem}")]
    RowShape {
        operation: &'static str,
        column: String,
        problem: String,
    },
}

impl GeoError {
    pub(crate) fn query(operation: &'static str, source: DbError) -> Self {
        GeoError::Query {
            operation,
            category: source.category(),
            source,
        }
    }

    /// Category of the underlying driver failure, for query errors.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            GeoError::Query { category, .. } => Some(*category),
            GeoError::Connect { source, .. } => Some(source.category()),
            _ => None,
        }
    }
}
