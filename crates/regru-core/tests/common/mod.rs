//! Test doubles and common utilities for contract tests
//!
//! The scripted transport replays a queue of responses and counts attempts,
//! so tests can assert exactly how many requests reached the network layer.

#![allow(dead_code)]

use regru_core::traits::{HttpRequest, Transport};
use regru_core::{ClientConfig, ConnectionFailure, RegRuClient, TransportError};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One scripted attempt result
#[derive(Debug, Clone)]
pub enum Step {
    /// Respond with this body
    Body(String),
    /// Fail with this connection failure
    Fail(ConnectionFailure),
}

impl Step {
    pub fn body(body: impl Into<String>) -> Self {
        Step::Body(body.into())
    }
}

/// A transport that replays scripted steps and records every request
#[derive(Clone)]
pub struct ScriptedTransport {
    steps: Arc<Mutex<VecDeque<Step>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    attempts: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Transport that answers every call with the same body
    pub fn replying(body: impl Into<String>) -> Self {
        Self::new(vec![Step::body(body)])
    }

    /// Number of send() calls so far
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Requests seen so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The most recent request
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<String, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let mut steps = self.steps.lock().unwrap();
        // The last step repeats once the queue is drained
        let step = if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        };

        match step {
            Some(Step::Body(body)) => Ok(body),
            Some(Step::Fail(kind)) => Err(TransportError::new(kind, "scripted failure")),
            None => Err(TransportError::new(
                ConnectionFailure::Other,
                "script exhausted",
            )),
        }
    }

    fn transport_name(&self) -> &'static str {
        "scripted"
    }
}

/// A trace sink that keeps every line
#[derive(Clone, Default)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl regru_core::TraceSink for RecordingSink {
    fn trace(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

/// A readable stand-in CA bundle
pub fn trust_anchor_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "-----BEGIN CERTIFICATE-----").unwrap();
    writeln!(file, "-----END CERTIFICATE-----").unwrap();
    file
}

/// Configuration with credentials and a trust anchor
pub fn test_config(anchor: &tempfile::NamedTempFile) -> ClientConfig {
    ClientConfig::new()
        .with_credentials("test", "test")
        .with_trust_anchor(anchor.path())
}

/// Client over a scripted transport
pub fn client_with(
    transport: &ScriptedTransport,
    anchor: &tempfile::NamedTempFile,
) -> RegRuClient {
    RegRuClient::new(test_config(anchor), transport.clone()).expect("client construction succeeds")
}

/// Decode a form body into key/value pairs
pub fn form_pairs(request: &HttpRequest) -> Vec<(String, String)> {
    url::form_urlencoded::parse(request.body.as_deref().unwrap_or_default().as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Look up one form field
pub fn form_field(request: &HttpRequest, key: &str) -> Option<String> {
    form_pairs(request)
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}
