//! Retry policy for transport attempts
//!
//! The policy is an explicit loop over an attempt counter. A failed attempt is
//! retried when it is eligible and budget remains:
//!
//! - connection refused is always eligible
//! - every other connection failure is eligible only in retry-safe mode
//! - failures outside the connection layer are never eligible
//!
//! Both modes share the same budget. When the budget runs out, the last failure
//! is returned as [`Error::Connection`] and is not retried again.

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result, TransportError};
use crate::traits::{HttpRequest, Transport};

/// Bounded retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
    retry_safe: bool,
    backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy
    ///
    /// `max_attempts` counts the first attempt; zero is treated as one.
    pub fn new(max_attempts: usize, retry_safe: bool, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_safe,
            backoff,
        }
    }

    /// Policy described by a client configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.max_attempts, config.retry_safe, config.retry_backoff())
    }

    /// Total attempts per call
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Whether every connection failure is eligible for retry
    pub fn retry_safe(&self) -> bool {
        self.retry_safe
    }

    /// Delay between attempts
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Whether a failure may be retried under this policy
    pub fn is_eligible(&self, error: &TransportError) -> bool {
        error.is_retriable() || (self.retry_safe && error.is_connection_level())
    }

    /// Run `attempt` until it succeeds or the policy gives up
    ///
    /// The closure receives the 1-based attempt number.
    pub fn run<F>(&self, mut attempt: F) -> Result<String>
    where
        F: FnMut(usize) -> std::result::Result<String, TransportError>,
    {
        let mut number = 0;

        loop {
            number += 1;

            let error = match attempt(number) {
                Ok(body) => {
                    if number > 1 {
                        debug!("Request succeeded on attempt {}", number);
                    }
                    return Ok(body);
                }
                Err(error) => error,
            };

            if !self.is_eligible(&error) {
                debug!("Attempt {} failed, not retriable: {}", number, error);
                return Err(Error::from(error));
            }

            if number >= self.max_attempts {
                warn!("Giving up after {} attempts: {}", number, error);
                return Err(Error::from(error));
            }

            warn!("Attempt {}/{} failed: {}; retrying", number, self.max_attempts, error);

            if !self.backoff.is_zero() {
                thread::sleep(self.backoff);
            }
        }
    }

    /// Send `request` through `transport` under this policy
    pub fn execute(&self, transport: &dyn Transport, request: &HttpRequest) -> Result<String> {
        self.run(|_| transport.send(request))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, false, Duration::ZERO)
    }
}
