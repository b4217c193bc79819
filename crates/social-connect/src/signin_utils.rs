// Helpers for signup and connect flows that consume a stored sign-in attempt.

use std::sync::Arc;

use social_connect_core::connection::{Connection, ConnectionKey};
use social_connect_core::error::Result;
use social_connect_core::factory::ConnectionFactoryLocator;
use social_connect_core::repository::UsersConnectionRepository;
use social_connect_core::session::SessionStore;

use crate::signin_attempt::ProviderSignInAttempt;

/// Owns the process-wide collaborators and re-attaches them to attempts
/// loaded from a session.
#[derive(Debug, Clone)]
pub struct ProviderSignInUtils {
    connection_factory_locator: Arc<dyn ConnectionFactoryLocator>,
    connection_repository: Arc<dyn UsersConnectionRepository>,
}

impl ProviderSignInUtils {
    pub fn new(
        connection_factory_locator: Arc<dyn ConnectionFactoryLocator>,
        connection_repository: Arc<dyn UsersConnectionRepository>,
    ) -> Self {
        Self {
            connection_factory_locator,
            connection_repository,
        }
    }

    /// Re-inject collaborators into a deserialized attempt.
    pub fn restore(&self, mut attempt: ProviderSignInAttempt) -> ProviderSignInAttempt {
        attempt.attach(
            self.connection_factory_locator.clone(),
            self.connection_repository.clone(),
        );
        attempt
    }

    /// The session's pending attempt, attached and ready to use.
    pub async fn attempt_from_session(
        &self,
        session: &dyn SessionStore,
    ) -> Result<Option<ProviderSignInAttempt>> {
        Ok(ProviderSignInAttempt::load_from(session)
            .await?
            .map(|attempt| self.restore(attempt)))
    }

    /// The connection the user tried to sign in with, if a sign-in attempt is
    /// pending. Use it to pre-fill a signup form or show a provider-specific
    /// message.
    pub async fn get_connection_from_session(&self, session: &dyn SessionStore) -> Result<Option<Connection>> {
        match self.attempt_from_session(session).await? {
            Some(attempt) => Ok(Some(attempt.get_connection()?)),
            None => Ok(None),
        }
    }

    /// Link the pending provider account to `user_id`, after local signup or
    /// after an existing user signed in locally.
    ///
    /// Returns the linked key, or `None` when no attempt is pending. The
    /// session attribute is removed only after the link succeeded, so a
    /// [`DuplicateConnection`](social_connect_core::ConnectError::DuplicateConnection)
    /// leaves the attempt in place for the caller to report.
    pub async fn do_post_sign_up(&self, user_id: &str, session: &dyn SessionStore) -> Result<Option<ConnectionKey>> {
        let Some(attempt) = self.attempt_from_session(session).await? else {
            return Ok(None);
        };

        let key = attempt.connection_data().key();
        if let Err(err) = attempt.add_connection(user_id).await {
            tracing::warn!(user_id, connection = %key, error = %err, "post-signup linking failed");
            return Err(err);
        }

        ProviderSignInAttempt::clear_from(session).await?;
        tracing::info!(user_id, connection = %key, "linked provider account after signup");
        Ok(Some(key))
    }
}
