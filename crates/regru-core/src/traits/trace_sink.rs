//! Request/response trace sink
//!
//! The client writes one line per call: URL, redacted parameters and the raw
//! response. Lines always go to `tracing` at debug level; a [`TraceSink`]
//! additionally receives them when one is configured.

use std::panic::{self, AssertUnwindSafe};

/// Receiver of trace lines
///
/// Implemented for any `Fn(&str) + Send + Sync`, so a closure is enough:
///
/// ```rust
/// use std::sync::Arc;
/// use regru_core::traits::TraceSink;
///
/// let sink: Arc<dyn TraceSink> = Arc::new(|line: &str| eprintln!("{}", line));
/// sink.trace("request_v2: ...");
/// ```
pub trait TraceSink: Send + Sync {
    /// Receive one trace line (credentials are already redacted)
    fn trace(&self, line: &str);
}

impl<F> TraceSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn trace(&self, line: &str) {
        self(line)
    }
}

/// Deliver a line to `sink`, swallowing any panic raised by it
pub(crate) fn deliver(sink: &dyn TraceSink, line: &str) {
    if panic::catch_unwind(AssertUnwindSafe(|| sink.trace(line))).is_err() {
        tracing::warn!("Trace sink panicked; trace line dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_sink_receives_line() {
        let lines = Mutex::new(Vec::new());
        let sink = |line: &str| lines.lock().unwrap().push(line.to_string());

        deliver(&sink, "hello");
        assert_eq!(*lines.lock().unwrap(), vec!["hello".to_string()]);
    }

    struct PanickingSink;

    impl TraceSink for PanickingSink {
        fn trace(&self, _line: &str) {
            panic!("sink failure");
        }
    }

    #[test]
    fn test_panicking_sink_is_contained() {
        deliver(&PanickingSink, "hello");
    }
}
