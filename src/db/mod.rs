mod connection;
mod mysql;
mod postgres;
mod row;
mod schema;
mod sqlite;
mod statement;
mod target;
#[cfg(test)]
pub(crate) mod test_support;

pub use connection::*;
pub use mysql::MySqlBackend;
pub use postgres::PostgresBackend;
pub use row::*;
pub use schema::*;
pub use sqlite::SqliteBackend;
pub use statement::*;
pub use target::*;
