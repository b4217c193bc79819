// Provider sign-in attempt — a failed provider sign-in parked in the session.
//
// Created when the provider handshake succeeded but no local user is linked
// to the provider account. The next request (signup, or local sign-in then
// connect) uses it to link the new or existing local user to that account.
//
// Only the connection snapshot is serialized. The factory locator and the
// connection repository are process-wide and are skipped; after loading from
// a session they are `None` until re-attached.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use social_connect_core::connection::{Connection, ConnectionData};
use social_connect_core::error::{ConnectError, Result};
use social_connect_core::factory::ConnectionFactoryLocator;
use social_connect_core::repository::UsersConnectionRepository;
use social_connect_core::session::SessionStore;

/// Session attribute that sign-in attempts are stored under.
pub const SESSION_ATTRIBUTE: &str = concat!(module_path!(), "::ProviderSignInAttempt");

/// An attempt to sign in with a provider account that has no local user.
///
/// Use [`get_connection`](Self::get_connection) to show who the user tried
/// to sign in as or to pre-fill a signup form from the provider profile.
/// Linking happens through
/// [`ProviderSignInUtils::do_post_sign_up`](crate::ProviderSignInUtils::do_post_sign_up).
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSignInAttempt {
    connection_data: ConnectionData,

    #[serde(skip)]
    connection_factory_locator: Option<Arc<dyn ConnectionFactoryLocator>>,

    #[serde(skip)]
    connection_repository: Option<Arc<dyn UsersConnectionRepository>>,
}

impl fmt::Debug for ProviderSignInAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSignInAttempt")
            .field("connection", &self.connection_data.key())
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl ProviderSignInAttempt {
    pub fn new(
        connection: &Connection,
        connection_factory_locator: Arc<dyn ConnectionFactoryLocator>,
        connection_repository: Arc<dyn UsersConnectionRepository>,
    ) -> Self {
        Self {
            connection_data: connection.create_data(),
            connection_factory_locator: Some(connection_factory_locator),
            connection_repository: Some(connection_repository),
        }
    }

    /// The snapshot captured when the attempt was made.
    pub fn connection_data(&self) -> &ConnectionData {
        &self.connection_data
    }

    pub fn provider_id(&self) -> &str {
        &self.connection_data.provider_id
    }

    /// Whether both collaborators are present.
    pub fn is_attached(&self) -> bool {
        self.connection_factory_locator.is_some() && self.connection_repository.is_some()
    }

    /// Re-inject the collaborators after loading from a session.
    pub fn attach(
        &mut self,
        connection_factory_locator: Arc<dyn ConnectionFactoryLocator>,
        connection_repository: Arc<dyn UsersConnectionRepository>,
    ) {
        self.connection_factory_locator = Some(connection_factory_locator);
        self.connection_repository = Some(connection_repository);
    }

    /// Rebuild the connection to the provider account the user tried to sign
    /// in as.
    ///
    /// Fails with [`ConnectError::UnregisteredProvider`] if no factory is
    /// registered for the snapshot's provider.
    pub fn get_connection(&self) -> Result<Connection> {
        let locator = self
            .connection_factory_locator
            .as_ref()
            .ok_or(ConnectError::Detached("ProviderSignInAttempt"))?;
        let factory = locator.get_connection_factory(&self.connection_data.provider_id)?;
        Ok(factory.create_connection(&self.connection_data))
    }

    /// Connect the local user to the provider account.
    ///
    /// Fails with [`ConnectError::DuplicateConnection`] if the user already
    /// has this connection.
    pub(crate) async fn add_connection(&self, user_id: &str) -> Result<()> {
        let repository = self
            .connection_repository
            .as_ref()
            .ok_or(ConnectError::Detached("ProviderSignInAttempt"))?;
        let connection = self.get_connection()?;
        repository
            .create_connection_repository(user_id)
            .await?
            .add_connection(&connection)
            .await
    }

    /// Serialize into the session, replacing any earlier attempt.
    pub async fn store_in(&self, session: &dyn SessionStore) -> Result<()> {
        let value = serde_json::to_string(self)?;
        session.set(SESSION_ATTRIBUTE, &value).await?;
        tracing::debug!(connection = %self.connection_data.key(), "stored provider sign-in attempt");
        Ok(())
    }

    /// Load the attempt stored in the session, if any. The result is
    /// detached.
    pub async fn load_from(session: &dyn SessionStore) -> Result<Option<Self>> {
        match session.get(SESSION_ATTRIBUTE).await? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    pub async fn clear_from(session: &dyn SessionStore) -> Result<()> {
        session.remove(SESSION_ATTRIBUTE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use social_connect_core::connection::{ConnectionKey, SnapshotApiAdapter};
    use social_connect_core::factory::{AdapterConnectionFactory, ConnectionFactoryRegistry};
    use social_connect_core::session::MemorySessionStore;
    use social_connect_memory::MemoryUsersConnectionRepository;

    struct Fixture {
        locator: Arc<dyn ConnectionFactoryLocator>,
        users: Arc<MemoryUsersConnectionRepository>,
    }

    fn fixture() -> Fixture {
        let registry = ConnectionFactoryRegistry::new()
            .with_factory(Arc::new(AdapterConnectionFactory::new(
                "twitter",
                Arc::new(SnapshotApiAdapter),
            )))
            .unwrap();
        let locator: Arc<dyn ConnectionFactoryLocator> = Arc::new(registry);
        let users = Arc::new(MemoryUsersConnectionRepository::new(locator.clone()));
        Fixture { locator, users }
    }

    fn twitter_connection() -> Connection {
        Connection::new(
            ConnectionData::new("twitter", "1234")
                .with_display_name("@kdonald")
                .with_access_token("at-1"),
            Arc::new(SnapshotApiAdapter),
        )
    }

    #[test]
    fn test_session_attribute_is_type_path() {
        assert_eq!(
            SESSION_ATTRIBUTE,
            "social_connect::signin_attempt::ProviderSignInAttempt"
        );
    }

    #[test]
    fn test_debug_does_not_leak_tokens() {
        let fx = fixture();
        let attempt = ProviderSignInAttempt::new(&twitter_connection(), fx.locator, fx.users);
        let debug = format!("{attempt:?}");
        assert!(debug.contains("twitter"));
        assert!(!debug.contains("at-1"));
    }

    #[test]
    fn test_serialized_form_holds_only_the_snapshot() {
        let fx = fixture();
        let attempt = ProviderSignInAttempt::new(&twitter_connection(), fx.locator, fx.users);
        let json = serde_json::to_value(&attempt).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(json["connectionData"]["providerUserId"], "1234");
    }

    #[test]
    fn test_detached_get_connection_fails() {
        let json = serde_json::json!({
            "connectionData": { "providerId": "twitter", "providerUserId": "1234" }
        });
        let attempt: ProviderSignInAttempt = serde_json::from_value(json).unwrap();
        assert!(!attempt.is_attached());
        let err = attempt.get_connection().unwrap_err();
        assert!(matches!(err, ConnectError::Detached(_)));
    }

    #[tokio::test]
    async fn test_add_connection_links_user() {
        let fx = fixture();
        let attempt = ProviderSignInAttempt::new(&twitter_connection(), fx.locator, fx.users.clone());

        attempt.add_connection("local-user").await.unwrap();

        let repo = fx.users.create_connection_repository("local-user").await.unwrap();
        let linked = repo
            .get_connection(&ConnectionKey::new("twitter", "1234"))
            .await
            .unwrap();
        assert_eq!(linked.create_data(), twitter_connection().create_data());
    }

    #[tokio::test]
    async fn test_add_connection_twice_is_duplicate() {
        let fx = fixture();
        let attempt = ProviderSignInAttempt::new(&twitter_connection(), fx.locator, fx.users.clone());

        attempt.add_connection("local-user").await.unwrap();
        let err = attempt.add_connection("local-user").await.unwrap_err();

        assert!(matches!(err, ConnectError::DuplicateConnection(_)));
        assert!(err.is_user_facing());
        assert_eq!(fx.users.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_add_connection_detached_fails() {
        let fx = fixture();
        let attempt = ProviderSignInAttempt::new(&twitter_connection(), fx.locator, fx.users.clone());
        let value = serde_json::to_string(&attempt).unwrap();
        let restored: ProviderSignInAttempt = serde_json::from_str(&value).unwrap();

        let err = restored.add_connection("local-user").await.unwrap_err();
        assert!(matches!(err, ConnectError::Detached(_)));
        assert_eq!(fx.users.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_store_load_clear() {
        let fx = fixture();
        let session = MemorySessionStore::new();
        let attempt = ProviderSignInAttempt::new(&twitter_connection(), fx.locator.clone(), fx.users.clone());

        attempt.store_in(&session).await.unwrap();
        let mut loaded = ProviderSignInAttempt::load_from(&session).await.unwrap().unwrap();
        assert!(!loaded.is_attached());
        assert_eq!(loaded.connection_data(), attempt.connection_data());

        loaded.attach(fx.locator, fx.users);
        assert!(loaded.is_attached());
        assert_eq!(loaded.get_connection().unwrap().provider_id(), "twitter");

        ProviderSignInAttempt::clear_from(&session).await.unwrap();
        assert!(ProviderSignInAttempt::load_from(&session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_session_value_is_reported() {
        let session = MemorySessionStore::new();
        session.set(SESSION_ATTRIBUTE, "not json").await.unwrap();
        let err = ProviderSignInAttempt::load_from(&session).await.unwrap_err();
        assert!(matches!(err, ConnectError::Serialization(_)));
    }
}
