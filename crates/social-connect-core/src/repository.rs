// Connection persistence contracts.
//
// `UsersConnectionRepository` is the process-wide entry point; it hands out a
// `ConnectionRepository` scoped to one local user. Backends (in-memory, SQL)
// implement both.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::connection::{Connection, ConnectionKey};
use crate::error::Result;

/// Repository spanning every local user.
#[async_trait]
pub trait UsersConnectionRepository: Send + Sync + fmt::Debug {
    /// Local user ids linked to the connection's provider account.
    ///
    /// When none are linked and an implicit [`ConnectionSignUp`] is
    /// configured, the backend may create a user and return its id.
    async fn find_user_ids_with_connection(&self, connection: &Connection) -> Result<Vec<String>>;

    /// Local user ids linked to any of the given provider accounts.
    async fn find_user_ids_connected_to(
        &self,
        provider_id: &str,
        provider_user_ids: &[String],
    ) -> Result<Vec<String>>;

    /// Repository scoped to one local user. Fails with
    /// [`crate::ConnectError::InvalidUserId`] for an empty id.
    async fn create_connection_repository(&self, user_id: &str) -> Result<Arc<dyn ConnectionRepository>>;
}

/// Connections of a single local user.
#[async_trait]
pub trait ConnectionRepository: Send + Sync + fmt::Debug {
    /// Every registered provider id mapped to the user's connections for it
    /// (possibly empty), each list in rank order.
    async fn find_all_connections(&self) -> Result<BTreeMap<String, Vec<Connection>>>;

    /// The user's connections to one provider, in rank order.
    async fn find_connections(&self, provider_id: &str) -> Result<Vec<Connection>>;

    /// The lowest-ranked connection to the provider, if any.
    async fn find_primary_connection(&self, provider_id: &str) -> Result<Option<Connection>>;

    /// Fails with [`crate::ConnectError::NoSuchConnection`] if absent.
    async fn get_connection(&self, key: &ConnectionKey) -> Result<Connection>;

    /// Fails with [`crate::ConnectError::NotConnected`] if the user has no
    /// connection to the provider.
    async fn get_primary_connection(&self, provider_id: &str) -> Result<Connection>;

    /// Fails with [`crate::ConnectError::DuplicateConnection`] if the user
    /// already has a connection with the same key.
    async fn add_connection(&self, connection: &Connection) -> Result<()>;

    /// Overwrite the stored snapshot of an existing connection.
    async fn update_connection(&self, connection: &Connection) -> Result<()>;

    async fn remove_connections(&self, provider_id: &str) -> Result<()>;

    async fn remove_connection(&self, key: &ConnectionKey) -> Result<()>;
}

/// Implicit sign-up: creates a local user for a provider connection that has
/// no local mapping yet.
#[async_trait]
pub trait ConnectionSignUp: Send + Sync + fmt::Debug {
    /// The new local user id, or `None` to decline.
    async fn execute(&self, connection: &Connection) -> Option<String>;
}
