//! Legacy plain-text protocol

use serde_json::Value;

use super::{EnvelopeCodec, ProtocolGeneration, trim_base};
use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::operation::{Operation, Route};
use crate::params::RequestParams;
use crate::response::ApiResponse;

/// Marker that opens every successful legacy response
pub const SUCCESS_PREFIX: &str = "Success:";

/// Codec for the `/api/regru` endpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyCodec;

impl EnvelopeCodec for LegacyCodec {
    fn generation(&self) -> ProtocolGeneration {
        ProtocolGeneration::Legacy
    }

    fn endpoint(&self, base_url: &str, operation: Operation) -> Result<String> {
        match operation.route() {
            Route::Legacy { .. } => Ok(format!("{}/api/regru", trim_base(base_url))),
            Route::V2 { .. } => Err(Error::invalid_input(format!(
                "{} is not served by the legacy protocol",
                operation
            ))),
        }
    }

    fn encode(
        &self,
        operation: Operation,
        credentials: &Credentials,
        lang: &str,
        mut params: RequestParams,
    ) -> Result<RequestParams> {
        let Route::Legacy { action } = operation.route() else {
            return Err(Error::invalid_input(format!(
                "{} is not served by the legacy protocol",
                operation
            )));
        };

        params
            .insert("action", action)
            .insert("username", credentials.login())
            .insert("extended_message_lang", lang)
            .insert("password", credentials.password());

        Ok(params)
    }

    fn decode(&self, body: &str) -> Result<ApiResponse> {
        if body.starts_with(SUCCESS_PREFIX) {
            Ok(ApiResponse::success(Value::String(body.to_string())))
        } else {
            Ok(ApiResponse::failure(body, None))
        }
    }
}
