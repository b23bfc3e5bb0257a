//! Mock backend used during development and in tests.
//!
//! One [`MockBackend`] can be reached in-process through
//! [`MockTransport`] or over HTTP through [`server::serve`]; both answer
//! with the same status codes and JSON.

pub mod backend;
pub mod fixture;
pub mod server;
pub mod transport;

pub use backend::MockBackend;
pub use transport::{MockTransport, TimeoutPolicy, UnhandledPolicy};
