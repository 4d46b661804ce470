//! Host provisioning: recreate the workload schema and resource pools.

use crate::models::config::{DatabaseConfig, ResourcePoolConfig};
use crate::models::phase::QueryType;
use crate::services::executor::Executor;
use crate::Result;

/// Drop and recreate the schema and every declared resource pool.
pub async fn provision_host<E: Executor>(
    executor: &E,
    connection: &mut E::Connection,
    database: &DatabaseConfig,
) -> Result<()> {
    let schema = &database.schema_name;
    tracing::info!("Provisioning schema={}", schema);

    if exists(
        executor,
        connection,
        &format!(
            "SELECT count(*) as cnt FROM schemata WHERE schema_name = '{}'",
            schema
        ),
    )
    .await?
    {
        exec(executor, connection, &format!("DROP SCHEMA {} CASCADE", schema)).await?;
    }
    exec(executor, connection, &format!("CREATE SCHEMA {}", schema)).await?;

    for pool in &database.resource_pools {
        recreate_pool(executor, connection, pool).await?;
    }
    Ok(())
}

async fn recreate_pool<E: Executor>(
    executor: &E,
    connection: &mut E::Connection,
    pool: &ResourcePoolConfig,
) -> Result<()> {
    tracing::debug!("Recreating resource pool {}", pool.pool_name);
    if exists(
        executor,
        connection,
        &format!(
            "SELECT count(*) as cnt FROM resource_pools WHERE name = '{}'",
            pool.pool_name
        ),
    )
    .await?
    {
        exec(
            executor,
            connection,
            &format!("DROP RESOURCE POOL {}", pool.pool_name),
        )
        .await?;
    }
    exec(
        executor,
        connection,
        &format!(
            "CREATE RESOURCE POOL {} maxmemorysize '{}' maxconcurrency {} plannedconcurrency {}",
            pool.pool_name, pool.maxmemorysize, pool.maxconcurrency, pool.plannedconcurrency
        ),
    )
    .await
}

async fn exists<E: Executor>(
    executor: &E,
    connection: &mut E::Connection,
    statement: &str,
) -> Result<bool> {
    let rows = executor.run(connection, statement, QueryType::Select).await?;
    let count = rows
        .first()
        .and_then(|row| row.get("cnt"))
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(0);
    Ok(count > 0)
}

async fn exec<E: Executor>(
    executor: &E,
    connection: &mut E::Connection,
    statement: &str,
) -> Result<()> {
    executor.run(connection, statement, QueryType::Ddl).await?;
    Ok(())
}
