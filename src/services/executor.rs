//! Database executor interface.
//!
//! The engine never talks to a driver directly. It needs three operations:
//! open a connection for a host, run one statement on it, and close it.
//! Driver error detail is carried as an opaque message.

use crate::error::ExecutorError;
use crate::models::config::DatabaseConfig;
use crate::models::phase::{Host, QueryType};
use crate::models::request::Row;
use async_trait::async_trait;

/// Runs statements against one database host.
///
/// One executor is shared by every worker of a phase. Connections are not:
/// each worker opens its own and never hands it to another worker.
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    type Connection: Send;

    /// Open a connection to `host`.
    async fn open(
        &self,
        host: &Host,
        database: &DatabaseConfig,
    ) -> Result<Self::Connection, ExecutorError>;

    /// Run one statement. Rows are only expected for [`QueryType::Select`].
    async fn run(
        &self,
        connection: &mut Self::Connection,
        statement: &str,
        query_type: QueryType,
    ) -> Result<Vec<Row>, ExecutorError>;

    /// Close a connection.
    async fn close(&self, connection: Self::Connection);
}

/// Point a connection at the workload schema and resource pool.
pub async fn setup_session<E: Executor>(
    executor: &E,
    connection: &mut E::Connection,
    schema_name: &str,
    pool_name: &str,
) -> Result<(), ExecutorError> {
    executor
        .run(
            connection,
            &format!("set search_path to {}", schema_name),
            QueryType::Ddl,
        )
        .await?;
    executor
        .run(
            connection,
            &format!("set resource_pool to {}", pool_name),
            QueryType::Ddl,
        )
        .await?;
    Ok(())
}
