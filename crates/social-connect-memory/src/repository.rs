// In-memory connection repository.
//
// Rows are `(user id, rank, snapshot)` kept in a `Vec` behind a shared
// `tokio::sync::RwLock`. Live connections are rebuilt from the snapshot via
// the connection factory locator on every read, the same way a SQL backend
// would rebuild them from a table row.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use social_connect_core::connection::{Connection, ConnectionData, ConnectionKey};
use social_connect_core::error::{ConnectError, Result};
use social_connect_core::factory::ConnectionFactoryLocator;
use social_connect_core::options::AccountOptions;
use social_connect_core::repository::{ConnectionRepository, ConnectionSignUp, UsersConnectionRepository};

/// One stored user/provider link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRow {
    pub user_id: String,
    /// 1-based position among the user's connections to the same provider.
    pub rank: u32,
    pub data: ConnectionData,
}

impl ConnectionRow {
    fn is_for(&self, user_id: &str, key: &ConnectionKey) -> bool {
        self.user_id == user_id
            && self.data.provider_id == key.provider_id
            && self.data.provider_user_id == key.provider_user_id
    }
}

type Store = Vec<ConnectionRow>;

fn rebuild(locator: &dyn ConnectionFactoryLocator, data: &ConnectionData) -> Result<Connection> {
    Ok(locator
        .get_connection_factory(&data.provider_id)?
        .create_connection(data))
}

/// In-memory [`UsersConnectionRepository`].
///
/// Clones share the same store. Data is lost when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct MemoryUsersConnectionRepository {
    rows: Arc<RwLock<Store>>,
    locator: Arc<dyn ConnectionFactoryLocator>,
    connection_sign_up: Option<Arc<dyn ConnectionSignUp>>,
    allow_shared_provider_accounts: bool,
}

impl MemoryUsersConnectionRepository {
    pub fn new(locator: Arc<dyn ConnectionFactoryLocator>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
            locator,
            connection_sign_up: None,
            allow_shared_provider_accounts: false,
        }
    }

    pub fn with_options(mut self, options: &AccountOptions) -> Self {
        self.allow_shared_provider_accounts = options.allow_shared_provider_accounts;
        self
    }

    /// Enable implicit sign-up for connections with no local user.
    pub fn with_connection_sign_up(mut self, sign_up: Arc<dyn ConnectionSignUp>) -> Self {
        self.connection_sign_up = Some(sign_up);
        self
    }

    /// Get a copy of all rows (for debugging/testing).
    pub async fn snapshot(&self) -> Vec<ConnectionRow> {
        self.rows.read().await.clone()
    }

    /// Number of stored links.
    pub async fn connection_count(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Clear all data.
    pub async fn clear(&self) {
        self.rows.write().await.clear();
    }

    fn repository_for(&self, user_id: &str) -> MemoryConnectionRepository {
        MemoryConnectionRepository {
            user_id: user_id.to_string(),
            rows: self.rows.clone(),
            locator: self.locator.clone(),
            allow_shared_provider_accounts: self.allow_shared_provider_accounts,
        }
    }
}

#[async_trait]
impl UsersConnectionRepository for MemoryUsersConnectionRepository {
    async fn find_user_ids_with_connection(&self, connection: &Connection) -> Result<Vec<String>> {
        let key = connection.key();
        let mut user_ids: Vec<String> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|row| row.data.key() == key)
            .map(|row| row.user_id.clone())
            .collect();
        user_ids.sort();
        user_ids.dedup();

        if user_ids.is_empty() {
            if let Some(sign_up) = &self.connection_sign_up {
                if let Some(new_user_id) = sign_up.execute(connection).await {
                    tracing::info!(user_id = %new_user_id, connection = %key, "implicit sign-up");
                    self.repository_for(&new_user_id).add_connection(connection).await?;
                    return Ok(vec![new_user_id]);
                }
            }
        }

        Ok(user_ids)
    }

    async fn find_user_ids_connected_to(
        &self,
        provider_id: &str,
        provider_user_ids: &[String],
    ) -> Result<Vec<String>> {
        let mut user_ids: Vec<String> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|row| {
                row.data.provider_id == provider_id
                    && provider_user_ids.contains(&row.data.provider_user_id)
            })
            .map(|row| row.user_id.clone())
            .collect();
        user_ids.sort();
        user_ids.dedup();
        Ok(user_ids)
    }

    async fn create_connection_repository(&self, user_id: &str) -> Result<Arc<dyn ConnectionRepository>> {
        if user_id.is_empty() {
            return Err(ConnectError::InvalidUserId);
        }
        Ok(Arc::new(self.repository_for(user_id)))
    }
}

/// Connections of one local user, backed by the shared in-memory store.
#[derive(Debug, Clone)]
pub struct MemoryConnectionRepository {
    user_id: String,
    rows: Arc<RwLock<Store>>,
    locator: Arc<dyn ConnectionFactoryLocator>,
    allow_shared_provider_accounts: bool,
}

impl MemoryConnectionRepository {
    /// The user's rows for a provider, in rank order.
    async fn ranked_rows(&self, provider_id: &str) -> Vec<ConnectionRow> {
        let mut rows: Vec<ConnectionRow> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|row| row.user_id == self.user_id && row.data.provider_id == provider_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.rank);
        rows
    }
}

#[async_trait]
impl ConnectionRepository for MemoryConnectionRepository {
    async fn find_all_connections(&self) -> Result<BTreeMap<String, Vec<Connection>>> {
        let mut all: BTreeMap<String, Vec<Connection>> = self
            .locator
            .registered_provider_ids()
            .into_iter()
            .map(|id| (id, Vec::new()))
            .collect();

        let mut rows: Vec<ConnectionRow> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|row| row.user_id == self.user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.data
                .provider_id
                .cmp(&b.data.provider_id)
                .then(a.rank.cmp(&b.rank))
        });

        for row in &rows {
            let connection = rebuild(self.locator.as_ref(), &row.data)?;
            all.entry(row.data.provider_id.clone()).or_default().push(connection);
        }
        Ok(all)
    }

    async fn find_connections(&self, provider_id: &str) -> Result<Vec<Connection>> {
        self.ranked_rows(provider_id)
            .await
            .iter()
            .map(|row| rebuild(self.locator.as_ref(), &row.data))
            .collect()
    }

    async fn find_primary_connection(&self, provider_id: &str) -> Result<Option<Connection>> {
        match self.ranked_rows(provider_id).await.first() {
            Some(row) => Ok(Some(rebuild(self.locator.as_ref(), &row.data)?)),
            None => Ok(None),
        }
    }

    async fn get_connection(&self, key: &ConnectionKey) -> Result<Connection> {
        let data = self
            .rows
            .read()
            .await
            .iter()
            .find(|row| row.is_for(&self.user_id, key))
            .map(|row| row.data.clone())
            .ok_or_else(|| ConnectError::NoSuchConnection(key.clone()))?;
        rebuild(self.locator.as_ref(), &data)
    }

    async fn get_primary_connection(&self, provider_id: &str) -> Result<Connection> {
        self.find_primary_connection(provider_id)
            .await?
            .ok_or_else(|| ConnectError::NotConnected {
                provider_id: provider_id.to_string(),
            })
    }

    async fn add_connection(&self, connection: &Connection) -> Result<()> {
        let key = connection.key();
        // Duplicate check and insert happen under one write lock.
        let mut rows = self.rows.write().await;

        let taken = rows.iter().any(|row| {
            row.data.key() == key
                && (row.user_id == self.user_id || !self.allow_shared_provider_accounts)
        });
        if taken {
            tracing::debug!(user_id = %self.user_id, connection = %key, "duplicate connection");
            return Err(ConnectError::DuplicateConnection(key));
        }

        let rank = rows
            .iter()
            .filter(|row| row.user_id == self.user_id && row.data.provider_id == key.provider_id)
            .map(|row| row.rank)
            .max()
            .unwrap_or(0)
            + 1;

        rows.push(ConnectionRow {
            user_id: self.user_id.clone(),
            rank,
            data: connection.create_data(),
        });
        tracing::info!(user_id = %self.user_id, connection = %key, rank, "connection added");
        Ok(())
    }

    async fn update_connection(&self, connection: &Connection) -> Result<()> {
        let key = connection.key();
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|row| row.is_for(&self.user_id, &key))
            .ok_or_else(|| ConnectError::NoSuchConnection(key.clone()))?;
        row.data = connection.create_data();
        Ok(())
    }

    async fn remove_connections(&self, provider_id: &str) -> Result<()> {
        self.rows
            .write()
            .await
            .retain(|row| !(row.user_id == self.user_id && row.data.provider_id == provider_id));
        Ok(())
    }

    async fn remove_connection(&self, key: &ConnectionKey) -> Result<()> {
        self.rows
            .write()
            .await
            .retain(|row| !row.is_for(&self.user_id, key));
        Ok(())
    }
}
