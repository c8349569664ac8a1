use std::error::Error as StdError;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::Method;

/// Identifying details of one request, passed to the observer hooks.
#[derive(Debug, Clone, Copy)]
pub struct RequestInfo<'a> {
    /// HTTP method.
    pub method: &'a Method,
    /// Full composed URL, including the query string.
    pub url: &'a str,
    /// Path plus query string, without the base URL.
    pub path: &'a str,
    /// Request body, when one was sent.
    pub body: Option<&'a str>,
}

/// What went wrong, as reported to the failure hook.
#[derive(Debug, Clone, Copy)]
pub enum FailureDetail<'a> {
    /// A transport-level cause, reported before classification.
    Error(&'a (dyn StdError + 'static)),
    /// A non-ignored, non-2xx response.
    Status {
        /// The response status code.
        status: u16,
        /// The response body, verbatim.
        body: &'a str,
    },
}

/// Diagnostic events emitted while resolving the TLS configuration.
///
/// These replace ambient process-wide warnings: the observer decides where
/// they go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// `verify_certs`/`ca_certs` were supplied; a pre-built TLS context is
    /// the supported way to configure trust.
    DeprecatedTlsFlags,
    /// TLS is active but certificate verification was explicitly disabled.
    InsecureConnection {
        /// The host the insecure connection targets.
        host: String,
    },
}

/// Hooks invoked by the request executor and the TLS resolver.
///
/// The success or failure hook is called exactly once per request, always
/// before the public operation returns, except on the cancellation path,
/// where no hook is invoked at all.
pub trait TransportObserver: Send + Sync {
    /// A request completed with a 2xx (or explicitly ignored) status.
    fn on_success(&self, request: &RequestInfo<'_>, status: u16, body: &str, elapsed: Duration);

    /// A request failed at the transport level or with a non-ignored status.
    fn on_failure(&self, request: &RequestInfo<'_>, detail: FailureDetail<'_>, elapsed: Duration);

    /// A configuration diagnostic was raised during construction.
    fn on_diagnostic(&self, event: &Diagnostic);
}

/// Default observer: reports through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl TransportObserver for LogObserver {
    fn on_success(&self, request: &RequestInfo<'_>, status: u16, body: &str, elapsed: Duration) {
        info!(
            "{} {} [status:{} request:{:.3}s]",
            request.method,
            request.url,
            status,
            elapsed.as_secs_f64()
        );
        debug!("> {:?}", request.body);
        debug!("< {body:?}");
    }

    fn on_failure(&self, request: &RequestInfo<'_>, detail: FailureDetail<'_>, elapsed: Duration) {
        match detail {
            FailureDetail::Error(cause) => {
                warn!(
                    "{} {} [request:{:.3}s] failed: {cause}",
                    request.method,
                    request.url,
                    elapsed.as_secs_f64()
                );
                debug!("> {:?}", request.body);
            }
            FailureDetail::Status { status, body } => {
                warn!(
                    "{} {} [status:{} request:{:.3}s]",
                    request.method,
                    request.url,
                    status,
                    elapsed.as_secs_f64()
                );
                debug!("> {:?}", request.body);
                debug!("< {body:?}");
            }
        }
    }

    fn on_diagnostic(&self, event: &Diagnostic) {
        match event {
            Diagnostic::DeprecatedTlsFlags => warn!(
                "use of `verify_certs`/`ca_certs` is deprecated in favor of a pre-built `ssl_context`"
            ),
            Diagnostic::InsecureConnection { host } => warn!(
                "connecting to {host} using TLS with verify_certs disabled is insecure"
            ),
        }
    }
}
