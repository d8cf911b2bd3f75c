// # HTTPS Transport
//
// This crate provides the production `Transport` for the REG.RU client,
// built on a blocking reqwest client.
//
// ## Behavior
//
// - ✅ Peer certificate validated against the configured trust anchor ONLY
//   (built-in roots are disabled) when `strict_tls` is on
// - ✅ No peer validation when `strict_tls` is off (insecure escape hatch,
//   logged at warn level)
// - ✅ Optional TLS client identity (PEM or password-protected PKCS#12)
// - ✅ Open timeout = connect timeout; read timeout bounds the whole exchange
// - ✅ Idle connections are never kept, so every call opens its own
// - ❌ NO retry logic (owned by `RetryPolicy` in regru-core)
//
// ## Failure Classification
//
// | Underlying failure               | Kind       | Retriable |
// |----------------------------------|------------|-----------|
// | connection refused               | `Refused`  | yes       |
// | connection reset / aborted       | `Reset`    | no        |
// | EOF / closed before response end | `Dropped`  | no        |
// | connect or read timeout          | `TimedOut` | no        |
// | anything else                    | `Other`    | no        |

use regru_core::traits::{HttpRequest, Method, Transport};
use regru_core::{
    ClientConfig, ClientIdentity, ConnectionFailure, Error, RegRuClient, Result, TransportError,
};

use std::error::Error as StdError;
use std::fs;
use std::io;
use std::path::Path;

use reqwest::blocking::Client;
use reqwest::{Certificate, Identity};

/// User agent sent with every request
const USER_AGENT: &str = concat!("regru-rs/", env!("CARGO_PKG_VERSION"));

/// Build a ready client over HTTPS from configuration
///
/// Credentials come from `config`. Fails with [`Error::Config`] before any
/// network I/O if the configuration is incomplete.
pub fn connect(config: ClientConfig) -> Result<RegRuClient> {
    let transport = HttpsTransport::from_config(&config)?;
    RegRuClient::new(config, transport)
}

/// Build a ready client with explicit credentials
///
/// `login` and `password` fall back to the values in `config` when `None`.
pub fn connect_with_credentials(
    config: ClientConfig,
    login: Option<&str>,
    password: Option<&str>,
) -> Result<RegRuClient> {
    let transport = HttpsTransport::from_config(&config)?;
    RegRuClient::with_credentials(config, login, password, transport)
}

/// Blocking HTTPS transport
///
/// The inner reqwest client is configured once and never changed, so the
/// transport can be shared between threads.
#[derive(Debug, Clone)]
pub struct HttpsTransport {
    client: Client,
    strict_tls: bool,
}

impl HttpsTransport {
    /// Create a transport from configuration
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the configuration does not validate, the trust
    /// anchor holds no usable certificate, or the client identity cannot be
    /// loaded.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.open_timeout())
            .timeout(config.read_timeout())
            .pool_max_idle_per_host(0);

        if config.strict_tls {
            let anchor = config.trust_anchor()?;
            let certificates = load_trust_anchor(anchor.path())?;

            tracing::debug!(
                "Validating peers against {} certificate(s) from {}",
                certificates.len(),
                anchor.path().display()
            );

            builder = builder.tls_built_in_root_certs(false);
            for certificate in certificates {
                builder = builder.add_root_certificate(certificate);
            }
        } else {
            tracing::warn!("Strict TLS is disabled: the registrar certificate will NOT be validated");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(identity) = &config.client_identity {
            builder = builder.identity(load_identity(identity)?);
        }

        let client = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            strict_tls: config.strict_tls,
        })
    }

    /// Whether peer certificates are validated
    pub fn is_strict(&self) -> bool {
        self.strict_tls
    }
}

impl Transport for HttpsTransport {
    fn send(&self, request: &HttpRequest) -> std::result::Result<String, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self
                .client
                .post(&request.url)
                .body(request.body.clone().unwrap_or_default()),
        };

        for (name, value) in request.effective_headers() {
            builder = builder.header(name, value);
        }

        let response = builder.send().map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("{} {} returned HTTP {}", request.method.as_str(), request.url, status);
        }

        response.text().map_err(classify)
    }

    fn transport_name(&self) -> &'static str {
        "https"
    }
}

/// Read every certificate from a PEM bundle
fn load_trust_anchor(path: &Path) -> Result<Vec<Certificate>> {
    let pem = read_file(path, "CA certificate bundle")?;

    let certificates = Certificate::from_pem_bundle(&pem).map_err(|e| {
        Error::config(format!(
            "Invalid CA certificate bundle {}: {}",
            path.display(),
            e
        ))
    })?;

    if certificates.is_empty() {
        return Err(Error::config(format!(
            "CA certificate bundle {} contains no certificates",
            path.display()
        )));
    }

    Ok(certificates)
}

/// Load a TLS client identity
fn load_identity(identity: &ClientIdentity) -> Result<Identity> {
    identity.validate()?;

    match identity {
        ClientIdentity::Pem {
            certificate_path,
            private_key_path,
        } => {
            let certificate = read_file(certificate_path, "client certificate")?;
            let key = read_file(private_key_path, "client private key")?;
            Identity::from_pkcs8_pem(&certificate, &key)
                .map_err(|e| Error::config(format!("Invalid client identity: {}", e)))
        }
        ClientIdentity::Pkcs12 { path, password } => {
            let der = read_file(path, "client identity bundle")?;
            let password = password
                .as_deref()
                .ok_or_else(|| Error::config("The private key requires a password"))?;
            Identity::from_pkcs12_der(&der, password)
                .map_err(|e| Error::config(format!("Invalid client identity: {}", e)))
        }
    }
}

fn read_file(path: &Path, what: &str) -> Result<Vec<u8>> {
    fs::read(path)
        .map_err(|e| Error::config(format!("Failed to read {} {}: {}", what, path.display(), e)))
}

/// Map a reqwest failure to a classified transport error
fn classify(err: reqwest::Error) -> TransportError {
    let message = error_chain(&err);

    let kind = if err.is_timeout() {
        ConnectionFailure::TimedOut
    } else if let Some(kind) = io_failure(&err) {
        kind
    } else if message.contains("connection closed before message completed") {
        ConnectionFailure::Dropped
    } else if err.is_connect() && !is_tls_failure(&message) {
        ConnectionFailure::Other
    } else {
        ConnectionFailure::Request
    };

    TransportError::new(kind, message)
}

/// Certificate and handshake failures surface as connect errors too
fn is_tls_failure(message: &str) -> bool {
    let message = message.to_lowercase();
    ["certificate", "handshake", "tls", "ssl"]
        .iter()
        .any(|marker| message.contains(marker))
}

/// Classify the first `io::Error` in the source chain
fn io_failure(err: &reqwest::Error) -> Option<ConnectionFailure> {
    let mut source: Option<&(dyn StdError + 'static)> = err.source();

    while let Some(current) = source {
        if let Some(io_err) = current.downcast_ref::<io::Error>() {
            return Some(match io_err.kind() {
                io::ErrorKind::ConnectionRefused => ConnectionFailure::Refused,
                io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                    ConnectionFailure::Reset
                }
                io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe => {
                    ConnectionFailure::Dropped
                }
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ConnectionFailure::TimedOut,
                _ => ConnectionFailure::Other,
            });
        }
        source = current.source();
    }

    None
}

/// Render an error and all of its sources on one line
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(current) = source {
        message.push_str(": ");
        message.push_str(&current.to_string());
        source = current.source();
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    fn anchor_with(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn insecure_config(anchor: &tempfile::NamedTempFile) -> ClientConfig {
        ClientConfig::new()
            .with_credentials("test", "test")
            .with_trust_anchor(anchor.path())
            .with_strict_tls(false)
    }

    /// Serve one canned HTTP response; returns the address and the raw request
    fn serve_once(body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            request
        });

        (addr, handle)
    }

    fn read_request(stream: &mut std::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];

        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&data);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&data).into_owned()
    }

    #[test]
    fn test_post_returns_body_and_sends_form_content_type() {
        let anchor = anchor_with("unused");
        let transport = HttpsTransport::from_config(&insecure_config(&anchor)).unwrap();
        let (addr, server) = serve_once("Success: zone added");

        let request = HttpRequest::post(format!("{}/api/regru", addr), "action=zone_add_rr");
        let body = transport.send(&request).unwrap();
        assert_eq!(body, "Success: zone added");

        let raw = server.join().unwrap().to_lowercase();
        assert!(raw.starts_with("post /api/regru http/1.1"));
        assert!(raw.contains("content-type: application/x-www-form-urlencoded"));
        assert!(raw.ends_with("action=zone_add_rr"));
    }

    #[test]
    fn test_get_sends_extra_headers() {
        let anchor = anchor_with("unused");
        let transport = HttpsTransport::from_config(&insecure_config(&anchor)).unwrap();
        let (addr, server) = serve_once("ok");

        let request = HttpRequest::get(format!("{}/status", addr)).with_header("X-Trace", "abc");
        assert_eq!(transport.send(&request).unwrap(), "ok");

        let raw = server.join().unwrap().to_lowercase();
        assert!(raw.starts_with("get /status http/1.1"));
        assert!(raw.contains("x-trace: abc"));
        assert!(!raw.contains("content-type"));
    }

    #[test]
    fn test_refused_connection_is_retriable() {
        let anchor = anchor_with("unused");
        let transport = HttpsTransport::from_config(&insecure_config(&anchor)).unwrap();

        // Bind then release a port so nothing listens on it
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let err = transport
            .send(&HttpRequest::post(format!("http://127.0.0.1:{}/api/regru", port), ""))
            .unwrap_err();

        assert_eq!(err.kind, ConnectionFailure::Refused, "{}", err);
        assert!(err.is_retriable());
    }

    #[test]
    fn test_dropped_connection_is_not_retriable() {
        let anchor = anchor_with("unused");
        let transport = HttpsTransport::from_config(&insecure_config(&anchor)).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_request(&mut stream);
            drop(stream);
        });

        let err = transport
            .send(&HttpRequest::post(format!("http://{}/api/regru", addr), "a=1"))
            .unwrap_err();
        server.join().unwrap();

        assert_eq!(err.kind, ConnectionFailure::Dropped, "{}", err);
        assert!(!err.is_retriable(), "{:?}", err);
    }

    #[test]
    fn test_reset_connection_is_classified() {
        let anchor = anchor_with("unused");
        let transport = HttpsTransport::from_config(&insecure_config(&anchor)).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            // Closing with unread data in the receive buffer sends RST
            thread::sleep(Duration::from_millis(300));
            drop(stream);
        });

        let err = transport
            .send(&HttpRequest::post(format!("http://{}/api/regru", addr), "a=1"))
            .unwrap_err();
        server.join().unwrap();

        assert_eq!(err.kind, ConnectionFailure::Reset, "{}", err);
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_malformed_url_is_a_request_failure() {
        let anchor = anchor_with("unused");
        let transport = HttpsTransport::from_config(&insecure_config(&anchor)).unwrap();

        let err = transport
            .send(&HttpRequest::post("not a url", "a=1"))
            .unwrap_err();

        assert_eq!(err.kind, ConnectionFailure::Request, "{}", err);
        assert!(!err.is_connection_level());
    }

    #[test]
    fn test_tls_failures_are_recognized() {
        assert!(is_tls_failure(
            "error sending request: client error (Connect): The certificate was not trusted"
        ));
        assert!(is_tls_failure("ssl handshake failure"));
        assert!(!is_tls_failure("tcp connect error: Connection refused"));
    }

    #[test]
    fn test_read_timeout_is_not_retriable() {
        let anchor = anchor_with("unused");
        let config = insecure_config(&anchor).with_timeouts(1, 1);
        let transport = HttpsTransport::from_config(&config).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_request(&mut stream);
            thread::sleep(Duration::from_secs(3));
        });

        let err = transport
            .send(&HttpRequest::post(format!("http://{}/api/regru", addr), "a=1"))
            .unwrap_err();
        server.join().unwrap();

        assert_eq!(err.kind, ConnectionFailure::TimedOut, "{}", err);
    }

    #[test]
    fn test_strict_mode_rejects_bundle_without_certificates() {
        let anchor = anchor_with("this is not a certificate\n");
        let config = insecure_config(&anchor).with_strict_tls(true);

        let err = HttpsTransport::from_config(&config).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {:?}", err);
    }

    #[test]
    fn test_missing_trust_anchor_fails_before_network() {
        let config = ClientConfig::new()
            .with_credentials("test", "test")
            .with_trust_anchor("/no/such/cacert.pem");

        assert!(matches!(connect(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_pkcs12_identity_without_password_fails() {
        let anchor = anchor_with("unused");
        let bundle = anchor_with("der bytes");
        let config = insecure_config(&anchor).with_client_identity(ClientIdentity::Pkcs12 {
            path: bundle.path().to_path_buf(),
            password: None,
        });

        let err = HttpsTransport::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("requires a password"));
    }

    #[test]
    fn test_connect_end_to_end() {
        let anchor = anchor_with("unused");
        let (addr, server) = serve_once(
            r#"{"result":"success","answer":{"domains":[{"dname":"megashop.ru","result":"Available"}]}}"#,
        );

        let client = connect(insecure_config(&anchor).with_base_url(addr)).unwrap();
        let outcome = client.domain_check("megashop.ru").unwrap();
        assert!(outcome.value);

        let raw = server.join().unwrap();
        assert!(raw.starts_with("POST /api/regru2/domain/check HTTP/1.1"));
        assert!(raw.contains("output_format=json"));
    }
}
