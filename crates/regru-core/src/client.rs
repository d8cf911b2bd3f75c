//! REG.RU client facade
//!
//! [`RegRuClient`] holds credentials and configuration and exposes the
//! domain and DNS-zone operations. Each operation:
//!
//! 1. validates its required fields (no network I/O on failure)
//! 2. encodes parameters with the codec of its protocol generation
//! 3. sends the request through the transport under the retry policy
//! 4. decodes the body and extracts the operation's value
//!
//! Protocol-level failures are returned, not raised: every method hands back
//! the decoded [`ApiResponse`] (inside an [`Outcome`] where the method also
//! extracts a value) so callers can inspect `error_code` / `error_detail`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, error};

use crate::codec::ProtocolGeneration;
use crate::config::{ClientConfig, Credentials, TrustAnchor};
use crate::error::{Error, Result};
use crate::operation::Operation;
use crate::params::RequestParams;
use crate::response::{ApiResponse, Outcome};
use crate::retry::RetryPolicy;
use crate::traits::trace_sink::deliver;
use crate::traits::{HttpRequest, TraceSink, Transport};

/// Renewal answer statuses that count as a successful renewal
pub const POSITIVE_RENEW_ANSWER_STATUSES: &[&str] = &["renew_success", "only_bill_created"];

/// Fields a renewal request must carry
pub const REQUIRED_FIELDS_FOR_RENEW: &[&str] = &["period", "service_id"];

/// Record status that marks a domain as free to register
const AVAILABLE_STATUS: &str = "Available";

/// Registrar service identifier
pub type ServiceId = u64;

/// REG.RU API client
///
/// Immutable after construction and `Send + Sync`; one client can serve
/// concurrent calls from several threads.
pub struct RegRuClient {
    credentials: Credentials,
    config: ClientConfig,
    trust_anchor: TrustAnchor,
    transport: Box<dyn Transport>,
    retry: RetryPolicy,
    trace_sink: Option<Arc<dyn TraceSink>>,
}

impl fmt::Debug for RegRuClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegRuClient")
            .field("credentials", &self.credentials)
            .field("base_url", &self.config.base_url)
            .field("trust_anchor", &self.trust_anchor)
            .field("transport", &self.transport.transport_name())
            .field("retry", &self.retry)
            .field("trace_sink", &self.trace_sink.is_some())
            .finish()
    }
}

impl RegRuClient {
    /// Create a client using the credentials stored in `config`
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the trust anchor is missing or unreadable, or the
    /// credentials cannot be resolved. No request is made either way.
    pub fn new(config: ClientConfig, transport: impl Transport + 'static) -> Result<Self> {
        Self::with_credentials(config, None, None, transport)
    }

    /// Create a client with explicit credentials
    ///
    /// `login` and `password` fall back to the values in `config` when `None`.
    pub fn with_credentials(
        config: ClientConfig,
        login: Option<&str>,
        password: Option<&str>,
        transport: impl Transport + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let trust_anchor = config.trust_anchor()?;
        let credentials = config.credentials(login, password)?;
        let retry = RetryPolicy::from_config(&config);

        debug!(
            "Created REG.RU client (login={}, base_url={}, transport={})",
            credentials.login(),
            config.base_url,
            transport.transport_name()
        );

        Ok(Self {
            credentials,
            config,
            trust_anchor,
            transport: Box::new(transport),
            retry,
            trace_sink: None,
        })
    }

    /// Attach a trace sink
    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace_sink = Some(sink);
        self
    }

    /// Resolved credentials
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Configuration snapshot the client was built from
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Trust anchor the client validates the registrar against
    pub fn trust_anchor(&self) -> &TrustAnchor {
        &self.trust_anchor
    }

    /// Retry policy applied to every call
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Execute any routed operation and return the decoded response
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if the parameters cannot be encoded
    /// - [`Error::Connection`] once the retry policy gives up
    /// - [`Error::AccessDenied`] if the registrar rejects the source IP
    /// - [`Error::Json`] / [`Error::Http`] for malformed V2 responses
    pub fn request(&self, operation: Operation, params: RequestParams) -> Result<ApiResponse> {
        let codec = operation.protocol().codec();
        let url = codec.endpoint(&self.config.base_url, operation)?;
        let encoded = codec.encode(operation, &self.credentials, &self.config.lang, params)?;

        let request = HttpRequest::post(url.as_str(), encoded.to_form());

        debug!("Sending {} request to {}", operation, url);
        let body = self.retry.execute(self.transport.as_ref(), &request)?;

        self.trace(operation, &url, &encoded, &body);

        let decoded = codec.decode(&body);
        if let Err(Error::AccessDenied { detail }) = &decoded {
            error!("{} rejected: access denied from this IP ({})", operation, detail);
        }
        decoded
    }

    /// Check whether a domain is free to register
    ///
    /// Only one domain name is checked per call. The value is `true` iff the
    /// call succeeded and the first record has no `error_code` and status
    /// `"Available"`.
    pub fn domain_check(&self, name: &str) -> Result<Outcome<bool>> {
        if name.trim().is_empty() {
            return Err(Error::invalid_input("Domain name is required"));
        }

        let params = RequestParams::new().with("domains", json!([{ "dname": name }]));
        let response = self.request(Operation::DomainCheck, params)?;

        let available = response
            .answer_field("domains")
            .and_then(Value::as_array)
            .and_then(|records| records.first())
            .is_some_and(|record| {
                record.get("error_code").is_none_or(Value::is_null)
                    && record.get("result").and_then(Value::as_str) == Some(AVAILABLE_STATUS)
            });

        Ok(Outcome::new(available, response))
    }

    /// Register a domain
    ///
    /// `params` carries period, domain name, name servers and registrant
    /// contacts, for example:
    ///
    /// ```rust,ignore
    /// let params = RequestParams::new()
    ///     .with("period", 1)
    ///     .with("domain_name", "domain.ru")
    ///     .with("ns0", "ns1.reg.ru")
    ///     .with("ns1", "ns2.reg.ru")
    ///     .with("private_person_flag", 1)
    ///     .with("person", "Vassily N Pupkin")
    ///     .with("country", "RU")
    ///     .with("e_mail", "ncc@test.ru");
    /// let service_id = client.domain_create(params)?.value;
    /// ```
    ///
    /// The value is the new service id on success, `None` on failure.
    pub fn domain_create(&self, params: RequestParams) -> Result<Outcome<Option<ServiceId>>> {
        let response = self.request(Operation::DomainCreate, params)?;
        let service_id = service_id(&response);
        Ok(Outcome::new(service_id, response))
    }

    /// Renew a service
    ///
    /// `period` and `service_id` are required.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] without any network I/O if a required field is
    /// missing.
    pub fn domain_renew(&self, params: RequestParams) -> Result<Outcome<bool>> {
        let missing: Vec<&str> = REQUIRED_FIELDS_FOR_RENEW
            .iter()
            .copied()
            .filter(|field| !params.contains_key(field))
            .collect();

        if !missing.is_empty() {
            let provided: Vec<&str> = params.keys().collect();
            return Err(Error::invalid_input(format!(
                "{} should be provided in arguments. Missing: {}. Provided: {}",
                REQUIRED_FIELDS_FOR_RENEW.join(", "),
                missing.join(", "),
                if provided.is_empty() {
                    "nothing".to_string()
                } else {
                    provided.join(", ")
                }
            )));
        }

        let response = self.request(Operation::ServiceRenew, params)?;
        Ok(Outcome::new(is_renew_success(&response), response))
    }

    /// Resolve the service id of a domain (`domain/nop`)
    pub fn domain_service_id(&self, params: RequestParams) -> Result<Outcome<Option<ServiceId>>> {
        let response = self.request(Operation::DomainNop, params)?;
        let service_id = service_id(&response);
        Ok(Outcome::new(service_id, response))
    }

    /// Look up a service; the value is the first entry of `answer.services`
    pub fn service_get_info(&self, params: RequestParams) -> Result<Outcome<Option<Value>>> {
        let response = self.request(Operation::ServiceGetInfo, params)?;
        let service = response
            .answer_field("services")
            .and_then(Value::as_array)
            .and_then(|services| services.first())
            .cloned();
        Ok(Outcome::new(service, response))
    }

    /// Look up several domains at once
    ///
    /// The value maps each lower-cased domain name to its service record. It
    /// is empty when the call fails.
    pub fn get_info<S: AsRef<str>>(&self, domains: &[S]) -> Result<Outcome<BTreeMap<String, Value>>> {
        let input_data = json!({
            "domains": domains
                .iter()
                .map(|domain| json!({ "dname": domain.as_ref() }))
                .collect::<Vec<_>>()
        });

        let params = RequestParams::new()
            .with("input_format", "json")
            .with("input_data", input_data.to_string());

        let response = self.request(Operation::ServiceGetInfo, params)?;

        let services: BTreeMap<String, Value> = response
            .answer_field("services")
            .and_then(Value::as_array)
            .map(|services| {
                services
                    .iter()
                    .filter_map(|service| {
                        let dname = service.get("dname")?.as_str()?;
                        Some((dname.to_lowercase(), service.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Outcome::new(services, response))
    }

    /// Add a DNS resource record (legacy protocol)
    pub fn zone_add(&self, params: RequestParams) -> Result<ApiResponse> {
        self.request(Operation::ZoneAddRr, params)
    }

    /// Remove a DNS resource record (legacy protocol)
    pub fn zone_rm(&self, params: RequestParams) -> Result<ApiResponse> {
        self.request(Operation::ZoneRmRr, params)
    }

    /// Verify that the credentials and source IP are accepted (`user/nop`)
    pub fn nop(&self) -> Result<Outcome<bool>> {
        let response = self.request(Operation::UserNop, RequestParams::new())?;
        Ok(Outcome::new(response.is_success(), response))
    }

    fn trace(&self, operation: Operation, url: &str, params: &RequestParams, body: &str) {
        let line = format!(
            "request_{}: {} {} response: {}",
            match operation.protocol() {
                ProtocolGeneration::Legacy => "v1",
                ProtocolGeneration::V2 => "v2",
            },
            url,
            params.redacted(),
            body
        );

        debug!("{}", line);

        if let Some(sink) = &self.trace_sink {
            deliver(sink.as_ref(), &line);
        }
    }
}

/// Whether a renewal response reports success
///
/// True iff the call succeeded AND `answer.status` is one of
/// [`POSITIVE_RENEW_ANSWER_STATUSES`].
pub fn is_renew_success(response: &ApiResponse) -> bool {
    response.is_success()
        && response
            .answer_field("status")
            .and_then(Value::as_str)
            .is_some_and(|status| POSITIVE_RENEW_ANSWER_STATUSES.contains(&status))
}

/// `answer.service_id` as a number; numeric strings are accepted
fn service_id(response: &ApiResponse) -> Option<ServiceId> {
    match response.answer_field("service_id")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
