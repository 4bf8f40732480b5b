//! ScyllaDB schema creation

use crate::error::PersistenceError;
use scylla::Session;

pub async fn create_keyspace(session: &Session, keyspace: &str, replication_factor: u8) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );

    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create keyspace: {}", e)))?;

    Ok(())
}

/// One append-only log per (tenant, tab). Newest rows first on disk so
/// "last N" reads are a single LIMIT query.
pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    let rows_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.rows (
            tenant TEXT,
            tab TEXT,
            appended_at BIGINT,
            row_id UUID,
            columns LIST<TEXT>,
            PRIMARY KEY ((tenant, tab), appended_at, row_id)
        ) WITH CLUSTERING ORDER BY (appended_at DESC, row_id DESC)
    "#,
        keyspace
    );

    session
        .query_unpaged(rows_table, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create rows table: {}", e)))?;

    tracing::info!("All tables created successfully");
    Ok(())
}
