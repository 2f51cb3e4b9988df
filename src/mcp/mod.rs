//! Tool-invocation protocol (MCP) client
//!
//! The client side of the protocol spoken by the remote test executor,
//! built on rmcp: connection lifecycle, the `run_test_session` call and the
//! classification of progress notifications.

pub mod client;
pub mod notification;
pub mod transport;
pub mod types;

pub use client::{ConnectionState, ExecutorClient, NotificationHandler};
pub use notification::{classify, extract_payload, ProgressEvent};
pub use types::TestSessionResult;
