//! Pooled SQLite connection

use crate::config::CONFIG;
use di::inject;
use di::injectable;
use log::error;
use sqlx::SqlitePool;
use sqlx::migrate::MigrateError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::sync::RwLock;
use std::time::Duration;

/// Pool handed to every DI-created connection while tests are running.
static TEST_POOL: RwLock<Option<SqlitePool>> = RwLock::new(None);

pub struct DatabaseConnection {
    connection: SqlitePool,
}

#[injectable]
impl DatabaseConnection {
    #[inject]
    pub fn create() -> DatabaseConnection {
        if let Some(pool) = TEST_POOL.read().ok().and_then(|pool| pool.clone()) {
            return DatabaseConnection::from_pool(pool);
        }

        let options = SqliteConnectOptions::from_str(&CONFIG.database_url)
            .unwrap_or_else(|e| {
                error!("DATABASE_URL {:?} is not usable ({e}), using ephemeral.db", CONFIG.database_url);
                SqliteConnectOptions::new()
                    .filename("ephemeral.db")
                    .create_if_missing(true)
            })
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(CONFIG.database_max_connections)
            .connect_lazy_with(options);

        DatabaseConnection { connection: pool }
    }
}

impl DatabaseConnection {
    pub fn from_pool(pool: SqlitePool) -> DatabaseConnection {
        DatabaseConnection { connection: pool }
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!().run(&self.connection).await
    }

    /// Makes every subsequently injected connection share `pool`.
    pub fn set_test_pool(pool: SqlitePool) {
        if let Ok(mut slot) = TEST_POOL.write() {
            *slot = Some(pool);
        }
    }

    pub fn clear_test_pool() {
        if let Ok(mut slot) = TEST_POOL.write() {
            *slot = None;
        }
    }
}

impl Deref for DatabaseConnection {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl DerefMut for DatabaseConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.connection
    }
}
