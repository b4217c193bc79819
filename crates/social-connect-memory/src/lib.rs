// social-connect-memory — In-memory connection repository.
//
// Ephemeral storage for user/provider links. Intended for testing,
// prototyping and single-process deployments.

pub mod repository;

pub use repository::{ConnectionRow, MemoryConnectionRepository, MemoryUsersConnectionRepository};
