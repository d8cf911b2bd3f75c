//! Envelope codecs
//!
//! The registrar speaks two protocol generations:
//!
//! - **Legacy**: form-encoded request to `/api/regru`, free-text response whose
//!   success is marked by a leading `Success:`
//! - **V2**: form-encoded request to `/api/regru2/<group>/<command>`, JSON
//!   response envelope `{result, answer, error_code, error_params}`
//!
//! Each generation is one [`EnvelopeCodec`] implementation. The generation is
//! fixed per [`Operation`](crate::Operation), never inferred from a response.

pub mod legacy;
pub mod v2;

pub use legacy::LegacyCodec;
pub use v2::V2Codec;

use crate::config::Credentials;
use crate::error::Result;
use crate::operation::Operation;
use crate::params::RequestParams;
use crate::response::ApiResponse;

/// Protocol generation of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolGeneration {
    /// Plain-text legacy protocol
    Legacy,
    /// JSON-result protocol
    V2,
}

impl ProtocolGeneration {
    /// Codec implementing this generation
    pub fn codec(self) -> &'static dyn EnvelopeCodec {
        match self {
            ProtocolGeneration::Legacy => &LegacyCodec,
            ProtocolGeneration::V2 => &V2Codec,
        }
    }
}

/// Encoding and decoding rules of one protocol generation
pub trait EnvelopeCodec: Send + Sync {
    /// Generation implemented by this codec
    fn generation(&self) -> ProtocolGeneration;

    /// Absolute endpoint URL for `operation`
    ///
    /// # Parameters
    ///
    /// - `base_url`: scheme and host, e.g. `https://api.reg.ru`
    fn endpoint(&self, base_url: &str, operation: Operation) -> Result<String>;

    /// Add envelope fields (credentials, format negotiation) to caller fields
    ///
    /// Envelope fields override caller fields of the same name, except where
    /// a codec documents a caller-settable default.
    fn encode(
        &self,
        operation: Operation,
        credentials: &Credentials,
        lang: &str,
        params: RequestParams,
    ) -> Result<RequestParams>;

    /// Decode a raw response body
    ///
    /// Protocol-level failures decode to `Ok` with `success == false`. Only
    /// malformed bodies and fatal registrar conditions are `Err`.
    fn decode(&self, body: &str) -> Result<ApiResponse>;
}

pub(crate) fn trim_base(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}
