//! Core traits for the REG.RU client
//!
//! This module defines the abstract interfaces the client is built on.
//!
//! - [`Transport`]: Execute a single HTTP request attempt
//! - [`TraceSink`]: Receive request/response trace lines

pub mod transport;
pub mod trace_sink;

pub use transport::{HttpRequest, Method, Transport};
pub use trace_sink::TraceSink;
