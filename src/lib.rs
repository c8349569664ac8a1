//! search_transport: a single transport connection to one node of a search
//! cluster.
//!
//! The connection resolves its TLS and authentication configuration once at
//! construction, holds a reusable pooled session bound to one base URL, and
//! executes individual HTTP requests under a bounded timeout, translating
//! transport failures and status codes into the typed [`TransportError`]
//! taxonomy. Multi-node selection, failover and retry policy live in the
//! surrounding client, not here.
//!
//! # Example
//!
//! ```no_run
//! use search_transport::{ConnectionConfig, Method, NodeConnection, RequestOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), search_transport::TransportError> {
//! let config = ConnectionConfig {
//!     host: "localhost".to_string(),
//!     port: 9200,
//!     ..Default::default()
//! };
//! let connection = NodeConnection::new(config)?;
//!
//! let outcome = connection
//!     .perform_request(
//!         Method::GET,
//!         "/_search",
//!         RequestOptions {
//!             params: vec![("q".to_string(), "user:kimchy".to_string())],
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//! println!("{} -> {}", outcome.status, outcome.body);
//!
//! connection.close();
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or call it from within an async context.

#![warn(missing_docs)]

mod config;
mod connection;
mod error;
mod observer;
mod session;
mod tls;

// Re-export public API
pub use config::{
    ConnectionConfig, Credentials, HttpAuth, DEFAULT_CONTENT_TYPE, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_TIMEOUT,
};
pub use connection::{NodeConnection, RequestOptions, RequestOutcome, Transport};
pub use error::TransportError;
pub use observer::{Diagnostic, FailureDetail, LogObserver, RequestInfo, TransportObserver};

pub use reqwest::header::HeaderMap;
pub use reqwest::Method;
pub use tokio_util::sync::CancellationToken;
