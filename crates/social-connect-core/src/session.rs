// Session attribute store.
//
// Values are strings so that everything placed in a session has to go
// through serialization, the same as with a cookie or Redis backed session.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

/// Attribute storage for one user session.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Get an attribute. Returns `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

/// In-memory session. With a TTL, each attribute expires a fixed time after
/// its last write; reads do not extend it.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    attributes: RwLock<HashMap<String, MemoryEntry>>,
    ttl: Option<Duration>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes expire `ttl` after they were last written.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            attributes: RwLock::new(HashMap::new()),
            ttl: Some(ttl),
        }
    }

    /// Drop every attribute, as on logout or invalidation.
    pub async fn invalidate(&self) {
        self.attributes.write().await.clear();
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut attributes = self.attributes.write().await;
        if let Some(entry) = attributes.get(key) {
            if entry.expires_at.is_some_and(|at| Instant::now() >= at) {
                attributes.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);
        self.attributes.write().await.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.attributes.write().await.remove(key);
        Ok(())
    }
}
