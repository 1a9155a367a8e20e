use crate::config::AppConfig;
use crate::errors::ServiceError;
use futures::future::BoxFuture;
use metrics::{counter, gauge, histogram};
use sea_orm::{
    ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database with custom configuration
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Configuring database connection"
    );

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    gauge!("verdant_db.max_connections", config.max_connections as f64);

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!(error = %e, "Database connection establishment failed");
        ServiceError::DatabaseError(e)
    })?;

    info!("Database connection pool established successfully");
    Ok(db_pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Runs `f` inside one database transaction, committing on `Ok` and rolling
/// back on `Err`.
pub async fn with_transaction<F, T>(db: &DbPool, f: F) -> Result<T, ServiceError>
where
    F: for<'a> FnOnce(&'a DatabaseTransaction) -> BoxFuture<'a, Result<T, ServiceError>> + Send,
    T: Send,
{
    let transaction_id = Uuid::new_v4();
    let start = std::time::Instant::now();
    debug!(%transaction_id, "Starting database transaction");
    counter!("verdant_db.transaction.started", 1);

    let result = db.transaction::<_, T, ServiceError>(f).await;

    let elapsed = start.elapsed();
    histogram!("verdant_db.transaction.duration", elapsed);

    match &result {
        Ok(_) => {
            counter!("verdant_db.transaction.committed", 1);
            debug!(%transaction_id, ?elapsed, "Transaction committed");
        }
        Err(_) => {
            counter!("verdant_db.transaction.rolled_back", 1);
            warn!(%transaction_id, ?elapsed, "Transaction rolled back");
        }
    }

    result.map_err(|e| match e {
        sea_orm::TransactionError::Connection(e) => ServiceError::DatabaseError(e),
        sea_orm::TransactionError::Transaction(e) => e,
    })
}

/// Runs database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = std::time::Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!("Database migrations completed successfully in {:?}", elapsed),
        Err(e) => error!("Database migrations failed after {:?}: {}", elapsed, e),
    }

    result
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let start = std::time::Instant::now();
    let result = pool.ping().await.map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => {
            gauge!("verdant_db.connection_latency", elapsed.as_millis() as f64);
        }
        Err(e) => {
            error!("Database connection check failed after {:?}: {}", elapsed, e);
            counter!("verdant_db.connection_failures", 1);
        }
    }

    result
}

/// Closes the database connection pool
pub async fn close_pool(pool: DbPool) -> Result<(), ServiceError> {
    info!("Closing database connection pool");
    pool.close().await.map_err(ServiceError::DatabaseError)
}

/// Closes a pool that services still hold handles to. Every clone shares
/// the underlying pool, so the other handles see it closed too.
pub async fn close_shared_pool(pool: &Arc<DbPool>) -> Result<(), ServiceError> {
    close_pool(DbPool::clone(pool)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> DbPool {
        establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn migrations_run_on_sqlite() {
        use crate::entities::product;
        use rust_decimal_macros::dec;
        use sea_orm::{ActiveModelTrait, EntityTrait, Set};

        let pool = memory_pool().await;
        run_migrations(&pool).await.unwrap();
        check_connection(&pool).await.unwrap();

        let id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(id),
            vendor_id: Set(Uuid::new_v4()),
            product_code: Set("SEED-RICE-OM18".into()),
            name: Set("OM18 rice seed".into()),
            unit_price: Set(dec!(1250000)),
            discount_percentage: Set(dec!(10)),
            stock_quantity: Set(0),
            weight_kg: Set(dec!(1.5)),
            length_cm: Set(dec!(30)),
            width_cm: Set(dec!(20)),
            height_cm: Set(dec!(10)),
            is_active: Set(true),
            created_at: Set(chrono::Utc::now()),
            updated_at: Set(None),
        }
        .insert(&pool)
        .await
        .unwrap();

        let stored = product::Entity::find_by_id(id).one(&pool).await.unwrap().unwrap();
        assert_eq!(stored.unit_price, dec!(1250000));
    }

    #[tokio::test]
    async fn shared_pool_closes_while_handles_remain() {
        let pool = Arc::new(memory_pool().await);
        let held_by_services = pool.clone();

        close_shared_pool(&pool).await.unwrap();
        assert!(check_connection(&held_by_services).await.is_err());
    }

    #[tokio::test]
    async fn failed_closure_rolls_back() {
        let pool = memory_pool().await;
        let result: Result<(), ServiceError> = with_transaction(&pool, |_txn| {
            Box::pin(async move { Err(ServiceError::InvalidOperation("boom".into())) })
        })
        .await;
        assert!(matches!(result, Err(ServiceError::InvalidOperation(_))));
    }
}
