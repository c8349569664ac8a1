use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;

/// Error taxonomy for a node connection.
///
/// [`Configuration`](TransportError::Configuration) is construction-time and
/// fatal; the caller must fix the configuration. `Ssl`, `Timeout` and
/// `Connection` are per-request and recoverable by a caller-level
/// retry/failover policy. `Status` carries the HTTP status and body so the
/// caller can decide whether that status is retryable. `Cancelled` is not a
/// failure classification at all: it is produced only when the caller's own
/// cancellation signal fires, is never preceded by a failure log, and is
/// never emitted by the classifier.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Contradictory or incomplete configuration, detected at construction.
    #[error("improperly configured: {0}")]
    Configuration(String),

    /// TLS-level failure (handshake, certificate identity mismatch).
    #[error("TLS error after {elapsed:?}")]
    Ssl {
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
        /// Time spent before the failure surfaced.
        elapsed: Duration,
    },

    /// The request's deadline elapsed before the body was fully read.
    #[error("connection timeout after {elapsed:?}")]
    Timeout {
        /// The underlying transport error, when the transport layer itself
        /// reported the timeout; `None` when the deadline guard fired.
        #[source]
        source: Option<reqwest::Error>,
        /// Time spent before the deadline elapsed.
        elapsed: Duration,
    },

    /// Any other transport failure (DNS, connect, reset, protocol).
    #[error("connection error after {elapsed:?}")]
    Connection {
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
        /// Time spent before the failure surfaced.
        elapsed: Duration,
    },

    /// The exchange completed but the status was outside `[200, 300)` and
    /// not in the caller's ignore set.
    #[error("HTTP status {status}")]
    Status {
        /// The response status code.
        status: u16,
        /// The response body, verbatim.
        body: String,
    },

    /// The session was used after `close()`.
    #[error("connection has been closed")]
    Closed,

    /// The caller's cancellation signal fired; the request was abandoned.
    #[error("request cancelled")]
    Cancelled,
}

impl TransportError {
    /// The HTTP status code, for `Status` errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Maps a transport-level failure to its error kind.
///
/// Pure: no I/O, no state. A TLS or certificate cause anywhere in the source
/// chain wins over everything else; a transport-reported timeout comes next;
/// anything else is a generic connection error. Never invoked on the
/// cancellation path.
pub(crate) fn classify(source: reqwest::Error, elapsed: Duration) -> TransportError {
    if has_tls_cause(&source) {
        TransportError::Ssl { source, elapsed }
    } else if source.is_timeout() {
        TransportError::Timeout {
            source: Some(source),
            elapsed,
        }
    } else {
        TransportError::Connection { source, elapsed }
    }
}

/// Maps a non-ignored, non-2xx status code to its error kind.
pub(crate) fn classify_status(status: u16, body: String) -> TransportError {
    TransportError::Status { status, body }
}

/// Walks the source chain looking for a TLS-level cause.
///
/// A `rustls::Error` anywhere in the chain is definitive; otherwise fall
/// back on TLS-specific fragments of the rendered message, since reqwest
/// wraps handshake failures in opaque io errors. Plain "handshake" alone is
/// not enough: HTTP/2 and proxy handshakes fail with that word too, and
/// those are connection errors.
fn has_tls_cause(err: &(dyn StdError + 'static)) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if cause.downcast_ref::<rustls::Error>().is_some() {
            return true;
        }
        let rendered = cause.to_string().to_ascii_lowercase();
        if rendered.contains("certificate") || rendered.contains("tls handshake") {
            return true;
        }
        source = cause.source();
    }
    false
}
