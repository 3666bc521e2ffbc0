//! SQLite-backed [`KeyStore`] for the reorder command

use salon_common::order_key::OrderKey;
use salon_common::{KeyStore, Result};
use sqlx::SqlitePool;

/// Persists moved keys through the shared pool
#[derive(Clone)]
pub struct SqliteKeyStore {
    pool: SqlitePool,
}

impl SqliteKeyStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl KeyStore for SqliteKeyStore {
    async fn persist_key(&self, performance_id: &str, key: &OrderKey) -> Result<()> {
        super::performances::set_order_key(&self.pool, performance_id, key).await
    }
}
