//! # hpx-eventsource
//!
//! Client for server-sent event streams: an incremental wire-format parser
//! and a reconnecting [`EventSource`] built on top of it.
//!
//! ## Features
//!
//! - **Incremental parsing**: [`EventStream`] turns any byte-chunk stream into
//!   [`Event`]s, however the input is split
//! - **Transparent reconnects**: transport failures and 500/502/503/504
//!   responses are retried at a constant interval the server can change with
//!   a `retry` directive
//! - **Resumption**: the last seen event ID is sent as `Last-Event-ID`
//! - **Cancellable reads**: [`EventSource::close`] wakes a blocked
//!   [`EventSource::next`] from any task
//! - **Pluggable transport**: implement [`EventTransport`] or use the
//!   `reqwest`-backed default
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use hpx_eventsource::{EventSource, EventSourceConfig, RequestTemplate};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EventSourceConfig::new().default_retry_interval(Duration::from_secs(3));
//!     let source = EventSource::http(config, RequestTemplate::parse("https://example.com/events")?)?;
//!
//!     loop {
//!         let event = source.next().await?;
//!         println!("[{}] {}", &*event.name, event.data_str().unwrap_or("<binary>"));
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod parse;
pub mod request;
mod retry;
pub mod source;
pub mod transport;

// Re-export commonly used types
pub use config::EventSourceConfig;
pub use error::{BoxError, EventSourceError, EventSourceResult};
pub use parse::{Event, EventStream, EventStreamError};
pub use request::{RequestFactory, RequestTemplate};
pub use source::{EventSource, EventSourceState, LAST_EVENT_ID};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::{EventTransport, ResponseBody};
