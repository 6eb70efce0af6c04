//! Client context resolution
//!
//! Loads per-client metadata (revenue metric, display name, account id)
//! from a [`ClientStore`]. Resolution never fails: on a store error,
//! missing record or timeout the caller gets a minimal context.

use crate::config::EngineConfig;
use crate::error::QueryError;
use crate::models::QueryContext;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub mod postgres;

pub use postgres::PostgresClientStore;

/// Persisted client metadata row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientRecord {
    pub revenue_metric_id: Option<String>,
    pub name: Option<String>,
    pub klaviyo_account_id: Option<String>,
}

/// Trait for client metadata lookups
#[async_trait::async_trait]
pub trait ClientStore: Send + Sync {
    async fn lookup(&self, client_id: &str) -> Result<Option<ClientRecord>>;
}

/// In-memory client store for development and tests
#[derive(Clone, Default)]
pub struct InMemoryClientStore {
    clients: Arc<RwLock<HashMap<String, ClientRecord>>>,
}

impl InMemoryClientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, client_id: impl Into<String>, record: ClientRecord) {
        let mut clients = self.clients.write().await;
        clients.insert(client_id.into(), record);
    }
}

#[async_trait::async_trait]
impl ClientStore for InMemoryClientStore {
    async fn lookup(&self, client_id: &str) -> Result<Option<ClientRecord>> {
        let clients = self.clients.read().await;
        Ok(clients.get(client_id).cloned())
    }
}

pub struct ContextResolver {
    store: Arc<dyn ClientStore>,
    timeout: Duration,
    cache: Option<Arc<RwLock<HashMap<String, QueryContext>>>>,
}

impl ContextResolver {
    pub fn new(store: Arc<dyn ClientStore>, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            cache: None,
        }
    }

    /// Keep successfully loaded contexts for the life of the resolver.
    /// Minimal fallbacks are never cached.
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(Arc::new(RwLock::new(HashMap::new())));
        self
    }

    pub fn from_config(config: &EngineConfig, store: Arc<dyn ClientStore>) -> Self {
        let resolver = Self::new(store, config.context_timeout);
        if config.context_cache {
            resolver.with_cache()
        } else {
            resolver
        }
    }

    pub async fn resolve(&self, client_id: &str) -> QueryContext {
        if let Some(cache) = &self.cache {
            if let Some(context) = cache.read().await.get(client_id) {
                debug!(client_id, "Client context served from cache");
                return context.clone();
            }
        }

        match self.load(client_id).await {
            Ok(Some(context)) => {
                if let Some(cache) = &self.cache {
                    cache
                        .write()
                        .await
                        .insert(client_id.to_string(), context.clone());
                }
                context
            }
            Ok(None) => {
                debug!(client_id, "No client record, using minimal context");
                QueryContext::minimal(client_id)
            }
            Err(error) => {
                warn!(client_id, error = %error, "Falling back to minimal context");
                QueryContext::minimal(client_id)
            }
        }
    }

    /// Drop a cached context so the next resolve reloads it
    pub async fn invalidate(&self, client_id: &str) {
        if let Some(cache) = &self.cache {
            cache.write().await.remove(client_id);
        }
    }

    async fn load(&self, client_id: &str) -> Result<Option<QueryContext>> {
        let record = tokio::time::timeout(self.timeout, self.store.lookup(client_id))
            .await
            .map_err(|_| {
                QueryError::ContextLookupError(format!(
                    "lookup for {} timed out after {:?}",
                    client_id, self.timeout
                ))
            })?
            .map_err(|e| QueryError::ContextLookupError(e.to_string()))?;

        Ok(record.map(|record| QueryContext {
            client_id: client_id.to_string(),
            revenue_metric_id: record.revenue_metric_id,
            client_name: record.name,
            account_id: record.klaviyo_account_id,
        }))
    }
}

/// Postgres when a database URL is configured, otherwise in-memory
pub fn build_client_store(config: &EngineConfig) -> Arc<dyn ClientStore> {
    if let Some(url) = config.database_url.as_deref() {
        match PostgresClientStore::connect_lazy(url) {
            Ok(store) => {
                info!("Client store backend: postgres");
                return Arc::new(store);
            }
            Err(e) => {
                warn!(error = %e, "Postgres client store unavailable, using in-memory store");
            }
        }
    }

    info!("Client store backend: in-memory");
    Arc::new(InMemoryClientStore::new())
}
