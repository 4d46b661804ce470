//! Post-phase verification.
//!
//! For every table a phase lists, refresh its statistics and audit its
//! constraints on the controller's connection. Any failure fails the phase.

use crate::models::config::DatabaseConfig;
use crate::models::phase::{Phase, QueryType};
use crate::services::executor::{setup_session, Executor};
use crate::Result;

/// Run the verification step of `phase`.
pub async fn verify_phase<E: Executor>(
    executor: &E,
    connection: &mut E::Connection,
    phase: &Phase,
    database: &DatabaseConfig,
) -> Result<()> {
    if !phase.needs_verification() {
        return Ok(());
    }

    setup_session(executor, connection, &database.schema_name, &phase.pool_name).await?;

    for table in phase.verify_tables() {
        tracing::info!("Verifying phase={} table={}", phase.name, table);
        analyze_statistics(executor, connection, phase, table).await?;
        analyze_constraints(executor, connection, phase, table).await?;
    }
    Ok(())
}

async fn analyze_statistics<E: Executor>(
    executor: &E,
    connection: &mut E::Connection,
    phase: &Phase,
    table: &str,
) -> Result<()> {
    let statement = format!(
        "select /*+ label(analyze_stats_{0}) */ analyze_statistics('{0}') as analyze_result",
        table
    );
    let rows = executor
        .run(connection, &statement, QueryType::Select)
        .await
        .map_err(|e| verification_error(phase, table, e.to_string()))?;

    let result = rows.first().and_then(|row| row.get("analyze_result"));
    if result.and_then(serde_json::Value::as_i64) != Some(0) {
        return Err(verification_error(
            phase,
            table,
            format!(
                "analyze_statistics did not finish with result 0, result={}",
                result.map(ToString::to_string).unwrap_or_else(|| "none".to_string())
            ),
        ));
    }
    Ok(())
}

async fn analyze_constraints<E: Executor>(
    executor: &E,
    connection: &mut E::Connection,
    phase: &Phase,
    table: &str,
) -> Result<()> {
    let statement = format!(
        "select /*+ label(analyze_constraints_{0}) */ analyze_constraints('{0}') as analyze_result",
        table
    );
    let rows = executor
        .run(connection, &statement, QueryType::Select)
        .await
        .map_err(|e| verification_error(phase, table, e.to_string()))?;

    if let Some(first) = rows.first() {
        return Err(verification_error(
            phase,
            table,
            format!(
                "analyze_constraints found {} issues, first_issue={}",
                rows.len(),
                serde_json::to_string(first)?
            ),
        ));
    }
    Ok(())
}

fn verification_error(phase: &Phase, table: &str, message: String) -> crate::Error {
    crate::Error::Verification {
        phase: phase.name.clone(),
        table: table.to_string(),
        message,
    }
}
