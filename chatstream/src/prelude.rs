//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use chatstream::prelude::*;
//! ```

pub use crate::chat::{ChatRequest, ChatResponse, Choice};
pub use crate::client::ChatClient;
pub use crate::config::ClientConfig;
pub use crate::consumer::{Consumption, LatencyReport, LogEntry, StreamConsumer, Timed};
pub use crate::error::{ConfigError, Error, Interrupted, Result, TransportError};
pub use crate::message::{Message, Role};
pub use crate::stream::{BoxedFragmentSource, Fragment, FragmentSource};
pub use crate::transport::{SharedTransport, Transport};
pub use crate::usage::Usage;
