//! # social-connect-core
//!
//! Shared building blocks for provider sign-in and account linking:
//! - the connection model (`Connection`, `ConnectionData`, `ApiAdapter`)
//! - connection factories and the provider registry
//! - repository contracts for persisting user/provider links
//! - the session attribute store
//! - error types, options and logger setup

pub mod connection;
pub mod env;
pub mod error;
pub mod factory;
pub mod options;
pub mod repository;
pub mod session;

pub use connection::{ApiAdapter, Connection, ConnectionData, ConnectionKey, SnapshotApiAdapter, UserProfile};
pub use error::{ConnectError, ErrorCode, Result};
pub use factory::{AdapterConnectionFactory, ConnectionFactory, ConnectionFactoryLocator, ConnectionFactoryRegistry};
pub use options::{AccountOptions, ConnectOptions};
pub use repository::{ConnectionRepository, ConnectionSignUp, UsersConnectionRepository};
pub use session::{MemorySessionStore, SessionStore};
