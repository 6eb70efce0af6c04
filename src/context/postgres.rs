//! Postgres-backed client store

use super::{ClientRecord, ClientStore};
use crate::error::QueryError;
use crate::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

pub struct PostgresClientStore {
    pool: PgPool,
}

impl PostgresClientStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool without opening a connection
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .map_err(|e| {
                QueryError::DatabaseError(format!("Invalid client store URL: {}", e))
            })?;

        Ok(Self::new(pool))
    }
}

#[async_trait::async_trait]
impl ClientStore for PostgresClientStore {
    async fn lookup(&self, client_id: &str) -> Result<Option<ClientRecord>> {
        let row = sqlx::query(
            r#"
            SELECT revenue_metric_id, name, klaviyo_account_id
            FROM clients
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| QueryError::DatabaseError(format!("Client lookup failed: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(ClientRecord {
            revenue_metric_id: row.try_get("revenue_metric_id")?,
            name: row.try_get("name")?,
            klaviyo_account_id: row.try_get("klaviyo_account_id")?,
        }))
    }
}
