use std::sync::Arc;

use crate::auth::{TokenError, TokenService};
use crate::config::AppConfig;
use crate::database::{Collection, DocumentStore, Repository};

/// Shared handles every request sees.
///
/// The store is opened once at startup and injected here; handlers reach it
/// only through the per-collection repositories.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub tokens: Arc<TokenService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Result<Self, TokenError> {
        let tokens = TokenService::new(&config.security.access_token_secret)?;
        Ok(Self {
            store,
            tokens: Arc::new(tokens),
            config: Arc::new(config),
        })
    }

    pub fn items(&self) -> Repository {
        Repository::new(Collection::Items, self.store.clone())
    }

    pub fn overview(&self) -> Repository {
        Repository::new(Collection::Overview, self.store.clone())
    }

    pub fn profile(&self) -> Repository {
        Repository::new(Collection::Profile, self.store.clone())
    }
}
