// Provider sign-in dispatch.
//
// Runs once the provider handshake has produced a connection. Decides
// between signing the mapped local user in, parking a sign-in attempt for
// signup, or refusing an ambiguous mapping.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use social_connect_core::connection::Connection;
use social_connect_core::error::Result;
use social_connect_core::factory::ConnectionFactoryLocator;
use social_connect_core::options::ConnectOptions;
use social_connect_core::repository::UsersConnectionRepository;
use social_connect_core::session::SessionStore;

use crate::signin_attempt::ProviderSignInAttempt;
use crate::signin_utils::ProviderSignInUtils;

/// Application hook that establishes the local session for a user.
#[async_trait]
pub trait SignInAdapter: Send + Sync + fmt::Debug {
    /// Sign the user in. May return a URL to resume at instead of the
    /// configured post-sign-in URL.
    async fn sign_in(&self, user_id: &str, connection: &Connection, session: &dyn SessionStore) -> Result<Option<String>>;
}

/// Where a provider sign-in ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// Exactly one local user was linked and is now signed in.
    SignedIn { user_id: String, redirect_url: String },
    /// No local user is linked; an attempt was stored in the session.
    SignUpRequired { redirect_url: String },
    /// More than one local user is linked to the provider account.
    MultipleUsers { redirect_url: String },
}

impl SignInOutcome {
    pub fn redirect_url(&self) -> &str {
        match self {
            Self::SignedIn { redirect_url, .. }
            | Self::SignUpRequired { redirect_url }
            | Self::MultipleUsers { redirect_url } => redirect_url.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderSignIn {
    connection_factory_locator: Arc<dyn ConnectionFactoryLocator>,
    connection_repository: Arc<dyn UsersConnectionRepository>,
    sign_in_adapter: Arc<dyn SignInAdapter>,
    options: ConnectOptions,
}

impl ProviderSignIn {
    pub fn new(
        connection_factory_locator: Arc<dyn ConnectionFactoryLocator>,
        connection_repository: Arc<dyn UsersConnectionRepository>,
        sign_in_adapter: Arc<dyn SignInAdapter>,
        options: ConnectOptions,
    ) -> Self {
        Self {
            connection_factory_locator,
            connection_repository,
            sign_in_adapter,
            options,
        }
    }

    /// Helpers bound to the same collaborators.
    pub fn utils(&self) -> ProviderSignInUtils {
        ProviderSignInUtils::new(
            self.connection_factory_locator.clone(),
            self.connection_repository.clone(),
        )
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    pub async fn handle_sign_in(&self, connection: &Connection, session: &dyn SessionStore) -> Result<SignInOutcome> {
        let user_ids = self
            .connection_repository
            .find_user_ids_with_connection(connection)
            .await?;

        match user_ids.as_slice() {
            [] => {
                let attempt = ProviderSignInAttempt::new(
                    connection,
                    self.connection_factory_locator.clone(),
                    self.connection_repository.clone(),
                );
                attempt.store_in(session).await?;
                tracing::info!(connection = %connection.key(), "no local user for provider account, signup required");
                Ok(SignInOutcome::SignUpRequired {
                    redirect_url: self.options.sign_up_url.clone(),
                })
            }
            [user_id] => {
                // Keep stored tokens and profile values fresh.
                self.connection_repository
                    .create_connection_repository(user_id)
                    .await?
                    .update_connection(connection)
                    .await?;
                let original_url = self.sign_in_adapter.sign_in(user_id, connection, session).await?;
                tracing::info!(user_id = %user_id, connection = %connection.key(), "provider sign-in");
                Ok(SignInOutcome::SignedIn {
                    user_id: user_id.clone(),
                    redirect_url: original_url.unwrap_or_else(|| self.options.post_sign_in_url.clone()),
                })
            }
            _ => {
                tracing::warn!(connection = %connection.key(), users = user_ids.len(), "provider account linked to multiple users");
                Ok(SignInOutcome::MultipleUsers {
                    redirect_url: format!("{}?error=multiple_users", self.options.sign_in_url),
                })
            }
        }
    }
}
