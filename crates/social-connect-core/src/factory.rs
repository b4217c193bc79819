// Connection factories and the registry that locates them by provider id.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::connection::{ApiAdapter, Connection, ConnectionData};
use crate::error::{ConnectError, Result};

/// Rebuilds live connections for one provider.
pub trait ConnectionFactory: Send + Sync + fmt::Debug {
    /// Provider identifier (e.g., "twitter", "github").
    fn provider_id(&self) -> &str;

    /// Rebuild a connection from its snapshot. No provider round-trip.
    fn create_connection(&self, data: &ConnectionData) -> Connection;
}

/// Factory that pairs every connection with a shared [`ApiAdapter`].
#[derive(Debug, Clone)]
pub struct AdapterConnectionFactory {
    provider_id: String,
    api: Arc<dyn ApiAdapter>,
}

impl AdapterConnectionFactory {
    pub fn new(provider_id: impl Into<String>, api: Arc<dyn ApiAdapter>) -> Self {
        Self {
            provider_id: provider_id.into(),
            api,
        }
    }
}

impl ConnectionFactory for AdapterConnectionFactory {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn create_connection(&self, data: &ConnectionData) -> Connection {
        Connection::new(data.clone(), self.api.clone())
    }
}

/// Looks up connection factories by provider id.
///
/// Implementations are process-wide and usually not serializable.
pub trait ConnectionFactoryLocator: Send + Sync + fmt::Debug {
    /// Fails with [`ConnectError::UnregisteredProvider`] for unknown ids.
    fn get_connection_factory(&self, provider_id: &str) -> Result<Arc<dyn ConnectionFactory>>;

    /// Ids of every registered provider, sorted.
    fn registered_provider_ids(&self) -> Vec<String>;
}

/// Map-backed [`ConnectionFactoryLocator`].
#[derive(Debug, Default)]
pub struct ConnectionFactoryRegistry {
    factories: HashMap<String, Arc<dyn ConnectionFactory>>,
}

impl ConnectionFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory. A provider id may only be registered once.
    pub fn add_connection_factory(&mut self, factory: Arc<dyn ConnectionFactory>) -> Result<()> {
        let provider_id = factory.provider_id().to_string();
        if self.factories.contains_key(&provider_id) {
            return Err(ConnectError::DuplicateFactory(provider_id));
        }
        tracing::debug!(provider_id = %provider_id, "registered connection factory");
        self.factories.insert(provider_id, factory);
        Ok(())
    }

    /// Builder-style registration.
    pub fn with_factory(mut self, factory: Arc<dyn ConnectionFactory>) -> Result<Self> {
        self.add_connection_factory(factory)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl ConnectionFactoryLocator for ConnectionFactoryRegistry {
    fn get_connection_factory(&self, provider_id: &str) -> Result<Arc<dyn ConnectionFactory>> {
        self.factories.get(provider_id).cloned().ok_or_else(|| {
            tracing::warn!(provider_id, "no connection factory registered");
            ConnectError::UnregisteredProvider {
                provider_id: provider_id.to_string(),
            }
        })
    }

    fn registered_provider_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.factories.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::SnapshotApiAdapter;

    fn factory(provider_id: &str) -> Arc<dyn ConnectionFactory> {
        Arc::new(AdapterConnectionFactory::new(provider_id, Arc::new(SnapshotApiAdapter)))
    }

    #[test]
    fn test_lookup_registered_factory() {
        let registry = ConnectionFactoryRegistry::new()
            .with_factory(factory("twitter"))
            .unwrap();
        let f = registry.get_connection_factory("twitter").unwrap();
        assert_eq!(f.provider_id(), "twitter");

        let conn = f.create_connection(&ConnectionData::new("twitter", "99"));
        assert_eq!(conn.provider_id(), "twitter");
        assert_eq!(conn.provider_user_id(), "99");
    }

    #[test]
    fn test_lookup_unregistered_factory_fails() {
        let registry = ConnectionFactoryRegistry::new();
        let err = registry.get_connection_factory("myspace").unwrap_err();
        assert!(matches!(
            err,
            ConnectError::UnregisteredProvider { ref provider_id } if provider_id == "myspace"
        ));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ConnectionFactoryRegistry::new();
        registry.add_connection_factory(factory("github")).unwrap();
        let err = registry.add_connection_factory(factory("github")).unwrap_err();
        assert!(matches!(err, ConnectError::DuplicateFactory(ref id) if id == "github"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registered_provider_ids_sorted() {
        let registry = ConnectionFactoryRegistry::new()
            .with_factory(factory("twitter"))
            .unwrap()
            .with_factory(factory("facebook"))
            .unwrap();
        assert_eq!(registry.registered_provider_ids(), vec!["facebook", "twitter"]);
    }
}
