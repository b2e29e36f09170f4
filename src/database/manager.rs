use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::{AppConfig, StoreKind};
use crate::database::memory::MemoryDocumentStore;
use crate::database::postgres::PgDocumentStore;
use crate::database::DocumentStore;

/// Errors raised by the document store layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid document id: {0}")]
    InvalidId(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    /// True when the failure means the store could not be reached at all
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DatabaseError::Sqlx(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            )
        )
    }
}

/// Open the configured document store.
///
/// Called once at startup; the returned handle is shared by every request
/// through the router state and closed on shutdown.
pub async fn connect(config: &AppConfig) -> Result<Arc<dyn DocumentStore>, DatabaseError> {
    match config.database.store {
        StoreKind::Memory => {
            info!("Using in-memory document store");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
        StoreKind::Postgres => {
            let url = config.database_url()?;
            let store = PgDocumentStore::connect(&url, &config.database).await?;
            info!(database = %config.database.name, "Connected to Postgres document store");
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_needs_no_credentials() {
        let mut config = AppConfig::development();
        config.database.store = StoreKind::Memory;
        let store = connect(&config).await.unwrap();
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn postgres_store_requires_url_or_user() {
        let config = AppConfig::development();
        let err = connect(&config).await.err().unwrap();
        assert!(matches!(err, DatabaseError::ConfigMissing(_)));
    }

    #[test]
    fn classifies_unavailable_errors() {
        assert!(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(!DatabaseError::InvalidId("x".into()).is_unavailable());
        assert!(!DatabaseError::Sqlx(sqlx::Error::RowNotFound).is_unavailable());
    }
}
