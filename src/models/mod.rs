//! Shared types used across all modules.
//!
//! Defines the user entity, its write payloads, list pages, the list
//! filter state, and the health report. Other modules import from here
//! rather than reaching into each other's internals.

pub mod health;
pub mod search;
pub mod user;

pub use health::{HealthReport, ServiceHealth};
pub use search::{DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT, SearchParams};
pub use user::{CreateUser, Role, Status, UpdateUser, User, UserList};
