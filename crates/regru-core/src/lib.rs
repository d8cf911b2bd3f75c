// # regru-core
//
// Core library for the REG.RU registrar API client.
//
// ## Architecture Overview
//
// - **Transport**: Trait for executing one HTTP request attempt
// - **RetryPolicy**: Bounded retry loop around the transport
// - **EnvelopeCodec**: Legacy and V2 request/response envelopes
// - **RegRuClient**: Facade exposing domain and DNS-zone operations
//
// ## Design Principles
//
// 1. **Stateless calls**: A client holds only immutable configuration
// 2. **Explicit protocol**: Each operation has a fixed protocol generation
// 3. **Failures are values**: Registrar rejections come back as `ApiResponse`
// 4. **Fail before the network**: Configuration and argument errors never
//    reach the transport

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod operation;
pub mod params;
pub mod response;
pub mod retry;
pub mod traits;

// Re-export core types for convenience
pub use client::{RegRuClient, ServiceId, is_renew_success};
pub use codec::{EnvelopeCodec, ProtocolGeneration};
pub use config::{ClientConfig, ClientIdentity, Credentials, TrustAnchor};
pub use error::{ConnectionFailure, Error, Result, TransportError};
pub use operation::{Operation, Route};
pub use params::RequestParams;
pub use response::{ApiResponse, Outcome};
pub use retry::RetryPolicy;
pub use traits::{HttpRequest, Method, TraceSink, Transport};
