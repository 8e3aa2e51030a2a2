//! querycache client
//!
//! GraphQL-over-HTTP transport, TOML configuration, tracing setup, and
//! the character lookup harness behind the `querycache-demo` binary.

pub mod config;
pub mod error;
pub mod harness;
pub mod telemetry;
pub mod transport;

pub use config::{ConfigError, DemoConfig, LogConfig, LogFormat};
pub use error::ClientError;
pub use harness::{character_query, render_message, Harness, LookupReport};
pub use transport::HttpTransport;
