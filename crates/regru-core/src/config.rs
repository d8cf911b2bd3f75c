//! Configuration types for the REG.RU client
//!
//! A [`ClientConfig`] is a plain value. Callers that want process-wide
//! defaults keep one `ClientConfig` around and hand each client a clone
//! (optionally adjusted with the `with_*` builders); a constructed client
//! owns its snapshot and never observes later changes to the defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Production API host
pub const DEFAULT_BASE_URL: &str = "https://api.reg.ru";

/// Client configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Account login (used when no explicit login is given to the client)
    #[serde(default)]
    pub login: Option<String>,

    /// Account password (used when no explicit password is given to the client)
    #[serde(default)]
    pub password: Option<String>,

    /// Path to the CA bundle used to validate the registrar's certificate
    #[serde(default)]
    pub trust_anchor_path: Option<PathBuf>,

    /// Validate the peer certificate against the trust anchor
    ///
    /// Setting this to `false` disables peer validation entirely.
    #[serde(default = "default_strict_tls")]
    pub strict_tls: bool,

    /// Retry every connection failure, not only refused connections
    #[serde(default)]
    pub retry_safe: bool,

    /// Connection establishment timeout (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub open_timeout_secs: u64,

    /// Response read timeout (in seconds)
    ///
    /// The HTTPS transport applies this as a whole-request deadline, so time
    /// spent connecting counts against it as well.
    #[serde(default = "default_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Total attempts per call, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Delay between attempts (in milliseconds, 0 retries immediately)
    #[serde(default)]
    pub retry_backoff_ms: u64,

    /// Scheme and host of the API, without a trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Language of registrar messages
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Optional TLS client identity
    #[serde(default)]
    pub client_identity: Option<ClientIdentity>,
}

impl ClientConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            login: None,
            password: None,
            trust_anchor_path: None,
            strict_tls: default_strict_tls(),
            retry_safe: false,
            open_timeout_secs: default_timeout_secs(),
            read_timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: 0,
            base_url: default_base_url(),
            lang: default_lang(),
            client_identity: None,
        }
    }

    /// Load configuration from `REGRU_*` environment variables
    ///
    /// Unset variables keep their defaults; unparsable values are errors.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();

        config.login = env::var("REGRU_LOGIN").ok();
        config.password = env::var("REGRU_PASSWORD").ok();
        config.trust_anchor_path = env::var("REGRU_CA_CERT_PATH").ok().map(PathBuf::from);

        if let Some(value) = env_parse("REGRU_STRICT_TLS")? {
            config.strict_tls = value;
        }
        if let Some(value) = env_parse("REGRU_RETRY_SAFE")? {
            config.retry_safe = value;
        }
        if let Some(value) = env_parse("REGRU_OPEN_TIMEOUT_SECS")? {
            config.open_timeout_secs = value;
        }
        if let Some(value) = env_parse("REGRU_READ_TIMEOUT_SECS")? {
            config.read_timeout_secs = value;
        }
        if let Some(value) = env_parse("REGRU_MAX_ATTEMPTS")? {
            config.max_attempts = value;
        }
        if let Some(value) = env_parse("REGRU_RETRY_BACKOFF_MS")? {
            config.retry_backoff_ms = value;
        }
        if let Ok(url) = env::var("REGRU_BASE_URL") {
            config.base_url = url;
        }

        Ok(config)
    }

    /// Set default credentials
    pub fn with_credentials(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self.password = Some(password.into());
        self
    }

    /// Set the trust anchor path
    pub fn with_trust_anchor(mut self, path: impl Into<PathBuf>) -> Self {
        self.trust_anchor_path = Some(path.into());
        self
    }

    /// Enable or disable peer certificate validation
    pub fn with_strict_tls(mut self, strict: bool) -> Self {
        self.strict_tls = strict;
        self
    }

    /// Enable or disable retry-safe mode
    pub fn with_retry_safe(mut self, retry_safe: bool) -> Self {
        self.retry_safe = retry_safe;
        self
    }

    /// Set open and read timeouts (in seconds)
    pub fn with_timeouts(mut self, open_secs: u64, read_secs: u64) -> Self {
        self.open_timeout_secs = open_secs;
        self.read_timeout_secs = read_secs;
        self
    }

    /// Set the attempt budget
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay between attempts
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the TLS client identity
    pub fn with_client_identity(mut self, identity: ClientIdentity) -> Self {
        self.client_identity = Some(identity);
        self
    }

    /// Connection establishment timeout
    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_secs)
    }

    /// Response read timeout
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Delay between attempts
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Resolve credentials: explicit arguments win, configured defaults follow
    pub fn credentials(&self, login: Option<&str>, password: Option<&str>) -> Result<Credentials> {
        let login = login
            .or(self.login.as_deref())
            .ok_or_else(|| Error::config("Login is required"))?;
        let password = password
            .or(self.password.as_deref())
            .ok_or_else(|| Error::config("Password is required"))?;

        Credentials::new(login, password)
    }

    /// Locate the configured trust anchor
    pub fn trust_anchor(&self) -> Result<TrustAnchor> {
        let path = self.trust_anchor_path.as_ref().ok_or_else(|| {
            Error::config("A path to the CA certificate bundle (trust_anchor_path) is required")
        })?;

        TrustAnchor::locate(path)
    }

    /// Validate the configuration
    ///
    /// Checks everything that can be checked without the network. Credentials
    /// are resolved separately by [`ClientConfig::credentials`] because they may
    /// be supplied explicitly at client construction.
    pub fn validate(&self) -> Result<()> {
        self.trust_anchor()?;

        if self.max_attempts == 0 {
            return Err(Error::config("max_attempts must be at least 1"));
        }

        if self.base_url.is_empty() {
            return Err(Error::config("base_url cannot be empty"));
        }

        if let Some(identity) = &self.client_identity {
            identity.validate()?;
        }

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_strict_tls() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_attempts() -> usize {
    3
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_lang() -> String {
    "ru".to_string()
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::config(format!("{} has an invalid value '{}': {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}

/// Account credentials
///
/// Immutable once built. The Debug implementation does NOT expose the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    login: String,
    password: String,
}

impl Credentials {
    /// Create credentials, rejecting empty values
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let login = login.into();
        let password = password.into();

        if login.is_empty() {
            return Err(Error::config("Login cannot be empty"));
        }
        if password.is_empty() {
            return Err(Error::config("Password cannot be empty"));
        }

        Ok(Self { login, password })
    }

    /// Account login
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Account password
    /// ⚠️ NEVER log this value
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("trust_anchor_path", &self.trust_anchor_path)
            .field("strict_tls", &self.strict_tls)
            .field("retry_safe", &self.retry_safe)
            .field("open_timeout_secs", &self.open_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("base_url", &self.base_url)
            .field("lang", &self.lang)
            .field("client_identity", &self.client_identity)
            .finish()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// CA certificate bundle used to validate the registrar's TLS identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    path: PathBuf,
}

impl TrustAnchor {
    /// Verify that the bundle exists and is readable
    pub fn locate(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(Error::config(format!(
                "CA certificate bundle not found: {}",
                path.display()
            )));
        }

        File::open(path).map_err(|e| {
            Error::config(format!(
                "CA certificate bundle is not readable: {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Path to the bundle
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// TLS client identity
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientIdentity {
    /// PEM certificate and unencrypted PKCS#8 private key
    Pem {
        /// Path to the PEM certificate (chain)
        certificate_path: PathBuf,
        /// Path to the PEM private key
        private_key_path: PathBuf,
    },

    /// PKCS#12 bundle protected by a password
    Pkcs12 {
        /// Path to the DER-encoded bundle
        path: PathBuf,
        /// Bundle password
        #[serde(default)]
        password: Option<String>,
    },
}

impl ClientIdentity {
    /// Validate the identity configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            ClientIdentity::Pem {
                certificate_path,
                private_key_path,
            } => {
                ensure_file(certificate_path, "client certificate")?;
                ensure_file(private_key_path, "client private key")
            }
            ClientIdentity::Pkcs12 { path, password } => {
                if password.as_deref().is_none_or(str::is_empty) {
                    return Err(Error::config("The private key requires a password"));
                }
                ensure_file(path, "client identity bundle")
            }
        }
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientIdentity::Pem {
                certificate_path,
                private_key_path,
            } => f
                .debug_struct("Pem")
                .field("certificate_path", certificate_path)
                .field("private_key_path", private_key_path)
                .finish(),
            ClientIdentity::Pkcs12 { path, password } => f
                .debug_struct("Pkcs12")
                .field("path", path)
                .field("password", &password.as_ref().map(|_| "<REDACTED>"))
                .finish(),
        }
    }
}

fn ensure_file(path: &Path, what: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::config(format!("{} not found: {}", what, path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn anchor_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "-----BEGIN CERTIFICATE-----").unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert!(config.strict_tls);
        assert!(!config.retry_safe);
        assert_eq!(config.open_timeout(), Duration::from_secs(60));
        assert_eq!(config.read_timeout(), Duration::from_secs(60));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_backoff(), Duration::ZERO);
        assert_eq!(config.base_url, "https://api.reg.ru");
    }

    #[test]
    fn test_serde_defaults_apply() {
        let config: ClientConfig = serde_json::from_str(r#"{"login":"test"}"#).unwrap();
        assert_eq!(config.login.as_deref(), Some("test"));
        assert!(config.strict_tls);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.lang, "ru");
    }

    #[test]
    fn test_explicit_credentials_win_over_defaults() {
        let config = ClientConfig::new().with_credentials("default", "secret");

        let creds = config.credentials(Some("explicit"), None).unwrap();
        assert_eq!(creds.login(), "explicit");
        assert_eq!(creds.password(), "secret");
    }

    #[test]
    fn test_missing_credentials_are_config_errors() {
        let config = ClientConfig::new();
        assert!(matches!(config.credentials(None, Some("pw")), Err(Error::Config(_))));
        assert!(matches!(config.credentials(Some("me"), None), Err(Error::Config(_))));
        assert!(matches!(config.credentials(Some(""), Some("pw")), Err(Error::Config(_))));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("test", "hunter2").unwrap();
        let debug = format!("{:?}", creds);
        assert!(debug.contains("test"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_config_debug_hides_password() {
        let config = ClientConfig::new().with_credentials("acct", "hunter2");
        let debug = format!("{:?}", config);
        assert!(debug.contains("acct"));
        assert!(debug.contains("<REDACTED>"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_validate_requires_trust_anchor() {
        let config = ClientConfig::new();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = ClientConfig::new().with_trust_anchor("/nonexistent/cacert.pem");
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let file = anchor_file();
        let config = ClientConfig::new().with_trust_anchor(file.path());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let file = anchor_file();
        let config = ClientConfig::new()
            .with_trust_anchor(file.path())
            .with_max_attempts(0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_pkcs12_identity_requires_password() {
        let file = anchor_file();
        let identity = ClientIdentity::Pkcs12 {
            path: file.path().to_path_buf(),
            password: None,
        };

        let err = identity.validate().unwrap_err();
        assert!(err.to_string().contains("requires a password"));

        let identity = ClientIdentity::Pkcs12 {
            path: file.path().to_path_buf(),
            password: Some("pw".to_string()),
        };
        assert!(identity.validate().is_ok());
    }

    #[test]
    fn test_builders_do_not_touch_the_original() {
        let defaults = ClientConfig::new().with_credentials("a", "b");
        let client_config = defaults.clone().with_credentials("c", "d").with_retry_safe(true);

        assert_eq!(defaults.login.as_deref(), Some("a"));
        assert!(!defaults.retry_safe);
        assert_eq!(client_config.login.as_deref(), Some("c"));
        assert!(client_config.retry_safe);
    }
}
