//! chatstream - blocking and streamed chat completions, timed.
//!
//! This crate calls an OpenAI-compatible chat completion API in two modes,
//! one complete response or an incremental stream of fragments, and measures
//! how long each takes to deliver.
//!
//! ```rust,ignore
//! use chatstream::prelude::*;
//!
//! let client = ChatClient::new(ClientConfig::from_env()?)?;
//! let consumer = StreamConsumer::new(client);
//!
//! let request = ChatRequest::new("gpt-4o-mini").user("1+1?").temperature(0.0).stream();
//! let consumption = consumer.consume(&request).await?;
//! println!("{}", consumption.full_text);
//! ```

pub mod chat;
pub mod client;
pub mod config;
pub mod consumer;
pub mod error;
pub mod message;
pub mod mock;
pub mod prelude;
pub mod sse;
pub mod stream;
pub mod transport;
mod types;
pub mod usage;

pub use chat::{ChatRequest, ChatResponse, Choice};
pub use client::ChatClient;
pub use config::ClientConfig;
pub use consumer::{Consumption, LatencyReport, LogEntry, StreamConsumer, Timed};
pub use error::{ConfigError, Error, Interrupted, Result, TransportError};
pub use message::{Message, Role};
pub use stream::{BoxedFragmentSource, Fragment, FragmentSource};
pub use transport::{SharedTransport, Transport};
pub use usage::Usage;
