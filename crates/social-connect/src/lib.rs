//! # social-connect
//!
//! Provider sign-in attempts and post-signup account linking.
//!
//! When a user signs in through a provider (Twitter, GitHub, ...) whose
//! account is not linked to any local user, the connection snapshot is parked
//! in the session as a [`ProviderSignInAttempt`]. After the user signs up or
//! signs in locally, [`ProviderSignInUtils::do_post_sign_up`] links the
//! provider account to the local user.
//!
//! ```rust,ignore
//! let sign_in = ProviderSignIn::new(locator, users, adapter, ConnectOptions::from_env());
//! match sign_in.handle_sign_in(&connection, &session).await? {
//!     SignInOutcome::SignUpRequired { redirect_url } => { /* show signup */ }
//!     outcome => { /* redirect to outcome.redirect_url() */ }
//! }
//!
//! // later, in the signup handler
//! sign_in.utils().do_post_sign_up(&new_user_id, &session).await?;
//! ```

pub mod signin;
pub mod signin_attempt;
pub mod signin_utils;

pub use signin::{ProviderSignIn, SignInAdapter, SignInOutcome};
pub use signin_attempt::{ProviderSignInAttempt, SESSION_ATTRIBUTE};
pub use signin_utils::ProviderSignInUtils;

pub use social_connect_core::{ConnectError, ConnectOptions, Connection, ConnectionData, ConnectionKey, ErrorCode, Result};
