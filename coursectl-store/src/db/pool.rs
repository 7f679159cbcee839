//! Connection lifecycle
//!
//! One physical connection per unit of work, leased from a sqlx `PgPool`.
//! A `Lease` is released explicitly or on drop, so connections go back to
//! the pool on every exit path, including a cancelled future.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{CatalogError, Result};

/// Hands out and takes back pooled connections.
///
/// Cheap to clone; clones share the pool and the lease counters.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    pool: PgPool,
    outstanding: Arc<AtomicUsize>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionManager {
    /// Create the pool and open the first connection.
    ///
    /// # Errors
    ///
    /// `ConnectionUnavailable` when the store cannot be reached.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.database_url)
            .await
            .map_err(|e| CatalogError::unavailable("failed to connect to postgres", e))?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            outstanding: Arc::new(AtomicUsize::new(0)),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Lease a connection. No retries: a pool timeout, refused connection
    /// or rejected login is reported straight away.
    pub async fn acquire(&self) -> Result<Lease> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| CatalogError::unavailable("could not acquire a connection", e))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        debug!(lease = id, "connection acquired");

        Ok(Lease {
            id,
            conn: Some(conn),
            outstanding: Arc::clone(&self.outstanding),
        })
    }

    /// Return a leased connection. Releasing twice is a no-op.
    pub fn release(&self, lease: &mut Lease) {
        lease.release();
    }

    /// Leases handed out and not yet released.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Close the pool, waiting for leased connections to come back.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Exclusive use of one pooled connection.
#[derive(Debug)]
pub struct Lease {
    id: u64,
    conn: Option<PoolConnection<Postgres>>,
    outstanding: Arc<AtomicUsize>,
}

impl Lease {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_released(&self) -> bool {
        self.conn.is_none()
    }

    /// The underlying connection, while the lease is held.
    pub fn connection(&mut self) -> Result<&mut PgConnection> {
        let id = self.id;
        self.conn
            .as_deref_mut()
            .ok_or_else(|| CatalogError::ConnectionUnavailable {
                reason: format!("lease {} already released", id),
                source: None,
            })
    }

    /// Give the connection back to the pool.
    pub fn release(&mut self) {
        if let Some(conn) = self.conn.take() {
            drop(conn);
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            debug!(lease = self.id, "connection released");
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::unreachable_manager;

    #[tokio::test]
    async fn unreachable_store_is_connection_unavailable() {
        let manager = unreachable_manager();
        let err = manager.acquire().await.unwrap_err();

        assert!(matches!(err, CatalogError::ConnectionUnavailable { .. }));
        assert!(err.is_retryable());
        assert_eq!(manager.outstanding(), 0);
    }

    #[tokio::test]
    async fn invalid_config_fails_before_connecting() {
        let config = StoreConfig {
            max_connections: 0,
            ..Default::default()
        };
        let err = ConnectionManager::connect(&config).await.unwrap_err();
        assert!(matches!(err, CatalogError::Config { .. }));
    }

    // Integration tests require a real database
    // Run with: DATABASE_URL=postgres://... cargo test -p coursectl-store -- --ignored

    async fn live_manager() -> ConnectionManager {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let config = StoreConfig {
            database_url: url,
            ..Default::default()
        };
        ConnectionManager::connect(&config).await.expect("connect failed")
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn release_is_idempotent() {
        let manager = live_manager().await;
        let mut lease = manager.acquire().await.expect("acquire failed");
        assert_eq!(manager.outstanding(), 1);

        let one: (i32,) = sqlx::query_as("SELECT 1")
            .fetch_one(lease.connection().expect("held"))
            .await
            .expect("query failed");
        assert_eq!(one.0, 1);

        manager.release(&mut lease);
        manager.release(&mut lease);
        lease.release();
        assert!(lease.is_released());
        assert_eq!(manager.outstanding(), 0);
        assert!(lease.connection().is_err());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn dropped_lease_is_released() {
        let manager = live_manager().await;
        {
            let _lease = manager.acquire().await.expect("acquire failed");
            assert_eq!(manager.outstanding(), 1);
        }
        assert_eq!(manager.outstanding(), 0);
    }
}
