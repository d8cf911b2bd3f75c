// # regructl - REG.RU command-line client
//
// A THIN front end over regru-core / regru-http. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging
// 3. Running one operation and printing the result as JSON
//
// No registrar logic lives here.
//
// ## Configuration
//
// - `REGRU_LOGIN`, `REGRU_PASSWORD`: account credentials
// - `REGRU_CA_CERT_PATH`: CA bundle used to validate the registrar
// - `REGRU_STRICT_TLS`: `false` disables peer validation (default `true`)
// - `REGRU_RETRY_SAFE`: retry every connection failure (default `false`)
// - `REGRU_OPEN_TIMEOUT_SECS`, `REGRU_READ_TIMEOUT_SECS`: timeouts (default 60)
// - `REGRU_MAX_ATTEMPTS`: attempts per call (default 3)
// - `REGRU_RETRY_BACKOFF_MS`: delay between attempts (default 0)
// - `REGRU_BASE_URL`: API base URL (default `https://api.reg.ru`)
// - `REGRU_LOG_LEVEL`: trace, debug, info, warn, error (default `info`)
//
// ## Example
//
// ```bash
// export REGRU_LOGIN=test
// export REGRU_PASSWORD=test
// export REGRU_CA_CERT_PATH=/etc/ssl/certs/ca-certificates.crt
//
// regructl check megashop.ru
// regructl renew --service-id 12345 --period 1
// ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use regru_core::{ClientConfig, Error, Outcome, RegRuClient, RequestParams};
use serde_json::{Value, json};
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CtlExitCode {
    /// The registrar accepted the request
    Success = 0,
    /// Configuration or argument error (nothing was sent)
    ConfigError = 1,
    /// Connection or unexpected runtime error
    RuntimeError = 2,
    /// The registrar rejected this source IP
    AccessDenied = 3,
    /// The registrar answered with a failure
    Rejected = 4,
}

impl From<CtlExitCode> for ExitCode {
    fn from(code: CtlExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Parser)]
#[command(name = "regructl", version, about = "REG.RU registrar API client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check whether a domain is available for registration
    Check {
        /// Domain name
        domain: String,
    },
    /// Renew a service
    Renew {
        /// Service id of the domain
        #[arg(long)]
        service_id: u64,
        /// Renewal period in years
        #[arg(long)]
        period: u32,
    },
    /// Show service records for one or more domains
    Info {
        /// Domain names
        #[arg(required = true)]
        domains: Vec<String>,
    },
    /// Resolve the service id of a domain
    ServiceId {
        /// Domain name
        domain: String,
    },
    /// Add a DNS resource record
    ZoneAdd(RecordArgs),
    /// Remove a DNS resource record
    ZoneRm(RecordArgs),
    /// Verify credentials and IP access
    Nop,
}

#[derive(Debug, clap::Args)]
struct RecordArgs {
    /// Zone (domain name)
    #[arg(long)]
    domain: String,
    /// Subdomain (`@` for the apex)
    #[arg(long, default_value = "@")]
    subdomain: String,
    /// Record type
    #[arg(long = "type", value_parser = ["A", "AAAA", "CNAME", "TXT", "MX"])]
    record_type: String,
    /// Record content
    #[arg(long)]
    content: String,
}

impl RecordArgs {
    fn to_params(&self) -> RequestParams {
        RequestParams::new()
            .with("domain_name", self.domain.as_str())
            .with("subdomain", self.subdomain.as_str())
            .with("record_type", self.record_type.as_str())
            .with("content", self.content.as_str())
    }
}

/// What to print and how to exit
struct Report {
    output: Value,
    success: bool,
}

impl Report {
    fn from_outcome<T: Into<Value>>(outcome: Outcome<T>) -> Result<Self> {
        let success = outcome.is_success();
        let response = serde_json::to_value(&outcome.response)?;
        Ok(Self {
            output: json!({ "value": outcome.value.into(), "response": response }),
            success,
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match env::var("REGRU_LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CtlExitCode::ConfigError.into();
    }

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return CtlExitCode::ConfigError.into();
        }
    };

    let client = match regru_http::connect(config) {
        Ok(client) => client,
        Err(e) => {
            error!("{}", e);
            return exit_code_for(&e).into();
        }
    };

    info!("Running {:?}", cli.command);

    match run(&client, &cli.command) {
        Ok(report) => {
            match serde_json::to_string_pretty(&report.output) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    error!("Failed to render output: {}", e);
                    return CtlExitCode::RuntimeError.into();
                }
            }

            if report.success {
                CtlExitCode::Success.into()
            } else {
                CtlExitCode::Rejected.into()
            }
        }
        Err(e) => {
            error!("{:#}", e);
            e.downcast_ref::<Error>()
                .map(exit_code_for)
                .unwrap_or(CtlExitCode::RuntimeError)
                .into()
        }
    }
}

/// Run one command against the registrar
fn run(client: &RegRuClient, command: &Command) -> Result<Report> {
    match command {
        Command::Check { domain } => {
            let outcome = client
                .domain_check(domain)
                .with_context(|| format!("checking {}", domain))?;
            Report::from_outcome(outcome)
        }
        Command::Renew { service_id, period } => {
            let params = RequestParams::new()
                .with("service_id", *service_id)
                .with("period", *period);
            let outcome = client
                .domain_renew(params)
                .with_context(|| format!("renewing service {}", service_id))?;
            Report::from_outcome(outcome)
        }
        Command::Info { domains } => {
            let outcome = client.get_info(domains.as_slice()).context("looking up domains")?;
            let Outcome { value, response } = outcome;
            let services: serde_json::Map<String, Value> = value.into_iter().collect();
            Report::from_outcome(Outcome::new(Value::Object(services), response))
        }
        Command::ServiceId { domain } => {
            let outcome = client
                .domain_service_id(RequestParams::new().with("domain_name", domain.as_str()))
                .with_context(|| format!("resolving service id of {}", domain))?;
            Report::from_outcome(outcome)
        }
        Command::ZoneAdd(record) => {
            let response = client.zone_add(record.to_params()).context("adding record")?;
            let success = response.is_success();
            Report::from_outcome(Outcome::new(success, response))
        }
        Command::ZoneRm(record) => {
            let response = client.zone_rm(record.to_params()).context("removing record")?;
            let success = response.is_success();
            Report::from_outcome(Outcome::new(success, response))
        }
        Command::Nop => Report::from_outcome(client.nop().context("checking access")?),
    }
}

/// Map a client error to an exit code
fn exit_code_for(err: &Error) -> CtlExitCode {
    match err {
        Error::Config(_) | Error::InvalidInput(_) => CtlExitCode::ConfigError,
        Error::AccessDenied { .. } => CtlExitCode::AccessDenied,
        _ => CtlExitCode::RuntimeError,
    }
}
