//! Postgres health checks.

use sqlx::PgPool;
use tracing::{debug, error};

/// Check Postgres connection health.
pub async fn check_connection(pool: &PgPool) -> bool {
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => {
            debug!("Postgres connection healthy");
            true
        }
        Err(e) => {
            error!("Postgres health check failed: {}", e);
            false
        }
    }
}

/// Initialize database schema.
pub async fn init_schema(pool: &PgPool) -> Result<(), String> {
    use crate::schema::all_tables;

    for ddl in all_tables() {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|e| format!("Failed to execute DDL: {}", e))?;
    }

    debug!("Ticket schema initialized");
    Ok(())
}
