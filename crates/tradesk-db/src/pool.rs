//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Lifecycle
//! ```text
//!  DbConfig::from_env()            TRADESK_DB_PATH, pool size, timeout
//!        │
//!        ▼
//!  Database::new(config)           WAL + foreign keys, then the embedded
//!        │                         crates/tradesk-db/migrations/sqlite
//!        ▼
//!  db.purchases() / products() / sales() / payments() / reports()
//!        │                         one transaction per ledger write
//!        ▼
//!  db.close()
//! ```
//!
//! ## WAL Mode
//! WAL lets readers run alongside the single writer. Concurrent writers are
//! still serialized by SQLite; a writer that loses the race sees `BUSY`,
//! which surfaces as [`DbError::Conflict`].

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::payment::PaymentRepository;
use crate::repository::product::ProductRepository;
use crate::repository::purchase::PurchaseRepository;
use crate::repository::report::ReportRepository;
use crate::repository::sale::SaleRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Environment variable naming the database file.
pub const ENV_DB_PATH: &str = "TRADESK_DB_PATH";
/// Environment variable for the pool size.
pub const ENV_MAX_CONNECTIONS: &str = "TRADESK_DB_MAX_CONNECTIONS";
/// Environment variable for the acquire timeout in seconds.
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "TRADESK_DB_CONNECT_TIMEOUT_SECS";

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/tradesk.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection acquire timeout.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Loads configuration from the environment.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `TRADESK_DB_PATH` | `tradesk.db` |
    /// | `TRADESK_DB_MAX_CONNECTIONS` | `5` |
    /// | `TRADESK_DB_CONNECT_TIMEOUT_SECS` | `30` |
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`DbConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> DbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = lookup(ENV_DB_PATH).unwrap_or_else(|| "tradesk.db".to_string());

        let max_connections: u32 = lookup(ENV_MAX_CONNECTIONS)
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .map_err(|_| invalid(ENV_MAX_CONNECTIONS, &lookup))?;
        if max_connections == 0 {
            return Err(invalid(ENV_MAX_CONNECTIONS, &lookup));
        }

        let timeout_secs: u64 = lookup(ENV_CONNECT_TIMEOUT_SECS)
            .unwrap_or_else(|| "30".to_string())
            .parse()
            .map_err(|_| invalid(ENV_CONNECT_TIMEOUT_SECS, &lookup))?;

        Ok(DbConfig::new(path)
            .max_connections(max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(timeout_secs)))
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// Single connection: every connection to `:memory:` is its own database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
        }
    }
}

fn invalid<F>(key: &str, lookup: &F) -> DbError
where
    F: Fn(&str) -> Option<String>,
{
    DbError::InvalidConfig {
        key: key.to_string(),
        value: lookup(key).unwrap_or_default(),
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone; repositories share the pool.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::from_env()?).await?;
/// let tenant = TenantId::new(session.tenant_id);
///
/// let receipt = db.sales().create_order(&tenant, order).await?;
/// for warning in &receipt.warnings {
///     // show underpricing / oversell notices
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the ledger file and runs pending migrations
    /// unless `config.run_migrations` is off.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite ships with foreign keys off
            .foreign_keys(true)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Raw-material purchases.
    pub fn purchases(&self) -> PurchaseRepository {
        PurchaseRepository::new(self.pool.clone())
    }

    /// Finished products and their stock.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Orders, returns and refund paybacks.
    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    /// Payments against purchases and sales.
    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.pool.clone())
    }

    /// Read-only projections.
    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
        assert!(total >= 1);
    }

    #[tokio::test]
    async fn test_deferred_migrations_run_on_demand() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert!(total >= 1);
        assert_eq!(applied, 0);

        db.run_migrations().await.unwrap();
        let (_, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(applied, total);
        db.close().await;
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
    }

    #[test]
    fn test_config_from_lookup_defaults() {
        let config = DbConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_path, PathBuf::from("tradesk.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_config_from_lookup_overrides() {
        let config = DbConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/data/shop.db"),
            (ENV_MAX_CONNECTIONS, "8"),
            (ENV_CONNECT_TIMEOUT_SECS, "3"),
        ]))
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/data/shop.db"));
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_config_from_lookup_rejects_garbage() {
        let err = DbConfig::from_lookup(lookup(&[(ENV_MAX_CONNECTIONS, "many")])).unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig { ref key, ref value }
            if key == ENV_MAX_CONNECTIONS && value == "many"));

        assert!(DbConfig::from_lookup(lookup(&[(ENV_MAX_CONNECTIONS, "0")])).is_err());
        assert!(DbConfig::from_lookup(lookup(&[(ENV_CONNECT_TIMEOUT_SECS, "-1")])).is_err());
    }
}
