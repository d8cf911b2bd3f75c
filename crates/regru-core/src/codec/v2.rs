//! V2 JSON-result protocol

use serde_json::{Map, Value};

use super::{EnvelopeCodec, ProtocolGeneration, trim_base};
use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::operation::{Operation, Route};
use crate::params::RequestParams;
use crate::response::{ApiResponse, UNKNOWN_ERROR_CODE};

/// Error code the registrar returns when the caller's IP is not allow-listed
pub const ACCESS_DENIED_FROM_IP: &str = "ACCESS_DENIED_FROM_IP";

/// Codec for the `/api/regru2/<group>/<command>` endpoints
#[derive(Debug, Clone, Copy, Default)]
pub struct V2Codec;

impl EnvelopeCodec for V2Codec {
    fn generation(&self) -> ProtocolGeneration {
        ProtocolGeneration::V2
    }

    fn endpoint(&self, base_url: &str, operation: Operation) -> Result<String> {
        match operation.route() {
            Route::V2 { group, command } => Ok(format!(
                "{}/api/regru2/{}/{}",
                trim_base(base_url),
                group,
                command
            )),
            Route::Legacy { .. } => Err(Error::invalid_input(format!(
                "{} is not served by the V2 protocol",
                operation
            ))),
        }
    }

    /// `input_format` is the one caller-settable envelope field; it defaults
    /// to `plain`. With `input_format=json` the caller's `input_data` must be
    /// JSON text already.
    fn encode(
        &self,
        operation: Operation,
        credentials: &Credentials,
        lang: &str,
        mut params: RequestParams,
    ) -> Result<RequestParams> {
        if let Route::Legacy { .. } = operation.route() {
            return Err(Error::invalid_input(format!(
                "{} is not served by the V2 protocol",
                operation
            )));
        }

        params.insert_default("input_format", "plain");

        if params.get("input_format").and_then(Value::as_str) == Some("json") {
            match params.get("input_data") {
                Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(Error::invalid_input(
                        "input_data must be serialized JSON text when input_format is json",
                    ));
                }
                None => {
                    return Err(Error::invalid_input(
                        "input_data is required when input_format is json",
                    ));
                }
            }
        }

        params
            .insert("output_format", "json")
            .insert("username", credentials.login())
            .insert("lang", lang)
            .insert("password", credentials.password());

        Ok(params)
    }

    fn decode(&self, body: &str) -> Result<ApiResponse> {
        let envelope: Value = serde_json::from_str(body)?;
        let Value::Object(envelope) = envelope else {
            return Err(Error::http(format!(
                "Expected a JSON object in the response, got: {}",
                body
            )));
        };

        if envelope.get("result").and_then(Value::as_str) == Some("success") {
            let answer = envelope
                .get("answer")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));
            return Ok(ApiResponse::success(answer));
        }

        let error_code = match envelope.get("error_code") {
            Some(Value::String(code)) if !code.is_empty() => code.clone(),
            Some(Value::Null) | Some(Value::String(_)) | None => UNKNOWN_ERROR_CODE.to_string(),
            Some(other) => other.to_string(),
        };

        let error_params = envelope.get("error_params");

        if error_code == ACCESS_DENIED_FROM_IP {
            let detail = error_params
                .map(Value::to_string)
                .unwrap_or_else(|| "no details".to_string());
            return Err(Error::access_denied(detail));
        }

        let error_detail = error_params
            .and_then(|p| p.get("error_detail"))
            .and_then(|d| match d {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            });

        Ok(ApiResponse::failure(error_code, error_detail))
    }
}
