use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use url::form_urlencoded;

use crate::config::ConnectionConfig;
use crate::error::{classify, classify_status, TransportError};
use crate::observer::{FailureDetail, LogObserver, RequestInfo, TransportObserver};
use crate::session::Session;
use crate::tls;

/// The capability a cluster client codes against: one node, one request at
/// a time, typed errors. [`NodeConnection`] is the concrete implementation.
pub trait Transport: Send + Sync {
    /// Executes one request against the node.
    fn perform_request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> impl Future<Output = Result<RequestOutcome, TransportError>> + Send;

    /// Releases the pooled session resources.
    fn close(&self);
}

/// Per-request options. All fields default to "not supplied".
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Query parameters, percent-encoded and `?`-joined onto the path.
    pub params: Vec<(String, String)>,

    /// Request body, sent verbatim.
    pub body: Option<String>,

    /// Deadline for this request; the session default applies when absent.
    pub timeout: Option<Duration>,

    /// Status codes outside `[200, 300)` to treat as successful outcomes.
    pub ignore: Vec<u16>,

    /// Extra headers for this request only; they override session defaults.
    pub headers: Option<HeaderMap>,

    /// Cancellation signal for this request only, raced against the
    /// connection's own token. Either one firing abandons the request with
    /// [`TransportError::Cancelled`].
    pub cancel: Option<CancellationToken>,
}

/// Result of one successfully executed request.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    /// HTTP status code.
    pub status: u16,

    /// Response headers; lookups are case-insensitive per HTTP semantics.
    pub headers: HeaderMap,

    /// Response body as text, verbatim.
    pub body: String,

    /// Wall-clock duration of the exchange, including the body read.
    pub elapsed: Duration,
}

/// A single transport connection to one node of a search cluster.
///
/// Construction resolves the TLS configuration once and opens a pooled
/// session; each [`perform_request`](NodeConnection::perform_request) call
/// executes one request under a bounded timeout. The connection is safe to
/// share across tasks; [`close`](NodeConnection::close) releases the pool
/// and must be scoped exactly once by the owner.
pub struct NodeConnection {
    session: Session,
    observer: Arc<dyn TransportObserver>,
    shutdown: CancellationToken,
}

impl NodeConnection {
    /// Opens a connection with the default log-based observer and a fresh
    /// cancellation token.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Configuration`] when the configuration is
    /// contradictory or incomplete; no session is created in that case.
    pub fn new(config: ConnectionConfig) -> Result<Self, TransportError> {
        Self::with_parts(config, Arc::new(LogObserver), CancellationToken::new())
    }

    /// Opens a connection with an explicit observer and cancellation token.
    ///
    /// Cancelling the token abandons any in-flight request with
    /// [`TransportError::Cancelled`]; the signal is never reclassified and
    /// no failure hook is invoked for it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Configuration`] when the configuration is
    /// contradictory or incomplete; no session is created in that case.
    pub fn with_parts(
        config: ConnectionConfig,
        observer: Arc<dyn TransportObserver>,
        shutdown: CancellationToken,
    ) -> Result<Self, TransportError> {
        let resolved = tls::resolve(&config, observer.as_ref())?;
        let session = Session::open(&config, resolved)?;
        Ok(NodeConnection {
            session,
            observer,
            shutdown,
        })
    }

    /// The immutable base URL this connection targets.
    pub fn base_url(&self) -> &str {
        self.session.base_url()
    }

    /// Executes one request against the node.
    ///
    /// The exchange counts as done only once the response body is fully
    /// read. The success or failure hook fires exactly once before this
    /// returns, except on the cancellation path, which propagates without
    /// logging or classification.
    ///
    /// # Errors
    ///
    /// One of the [`TransportError`] kinds: `Closed` after `close()`,
    /// `Timeout` when the deadline elapses, `Ssl`/`Connection` for
    /// transport failures, `Status` for a non-ignored non-2xx response,
    /// and `Cancelled` when the connection's token fires.
    pub async fn perform_request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<RequestOutcome, TransportError> {
        let client = self.session.client()?;

        let url_path = compose_url_path(path, &options.params);
        let url = format!(
            "{}{}",
            self.session.base_url().trim_end_matches('/'),
            url_path
        );

        let info = RequestInfo {
            method: &method,
            url: &url,
            path: &url_path,
            body: options.body.as_deref(),
        };

        let deadline = options
            .timeout
            .unwrap_or_else(|| self.session.default_timeout());
        let start = Instant::now();

        let mut request = client.request(method.clone(), url.as_str());
        if let Some(credentials) = self.session.credentials() {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }
        if let Some(headers) = &options.headers {
            request = request.headers(headers.clone());
        }
        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }

        // The exchange is done only once the body is drained. On every
        // abandoning path (timeout, cancellation) the in-flight future is
        // dropped here, which releases the response and returns its
        // connection to the pool exactly once.
        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, headers, body))
        };

        let call_cancelled = async {
            match &options.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        let guarded = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(TransportError::Cancelled),
            _ = call_cancelled => return Err(TransportError::Cancelled),
            outcome = tokio::time::timeout(deadline, exchange) => outcome,
        };

        let elapsed = start.elapsed();
        let (status, headers, body) = match guarded {
            Err(expired) => {
                self.observer
                    .on_failure(&info, FailureDetail::Error(&expired), elapsed);
                return Err(TransportError::Timeout {
                    source: None,
                    elapsed,
                });
            }
            Ok(Err(cause)) => {
                self.observer
                    .on_failure(&info, FailureDetail::Error(&cause), elapsed);
                return Err(classify(cause, elapsed));
            }
            Ok(Ok(parts)) => parts,
        };

        let code = status.as_u16();
        if !status.is_success() && !options.ignore.contains(&code) {
            self.observer.on_failure(
                &info,
                FailureDetail::Status {
                    status: code,
                    body: &body,
                },
                elapsed,
            );
            return Err(classify_status(code, body));
        }

        self.observer.on_success(&info, code, &body, elapsed);
        Ok(RequestOutcome {
            status: code,
            headers,
            body,
            elapsed,
        })
    }

    /// Releases the pooled session resources. Idempotent; subsequent
    /// requests fail with [`TransportError::Closed`].
    pub fn close(&self) {
        self.session.close();
    }
}

impl Transport for NodeConnection {
    fn perform_request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> impl Future<Output = Result<RequestOutcome, TransportError>> + Send {
        NodeConnection::perform_request(self, method, path, options)
    }

    fn close(&self) {
        NodeConnection::close(self);
    }
}

impl fmt::Debug for NodeConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConnection")
            .field("base_url", &self.session.base_url())
            .finish()
    }
}

/// Path plus `?`-joined, percent-encoded query string when params are
/// non-empty.
fn compose_url_path(path: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{path}?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(input: &[(&str, &str)]) -> Vec<(String, String)> {
        input
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn path_without_params_is_unchanged() {
        assert_eq!(compose_url_path("/_search", &[]), "/_search");
    }

    #[test]
    fn params_are_joined_with_a_question_mark() {
        assert_eq!(
            compose_url_path("/_search", &pairs(&[("q", "a")])),
            "/_search?q=a"
        );
    }

    #[test]
    fn params_are_percent_encoded() {
        assert_eq!(
            compose_url_path("/_search", &pairs(&[("q", "user:kimchy"), ("size", "10")])),
            "/_search?q=user%3Akimchy&size=10"
        );
    }

    #[test]
    fn spaces_use_form_encoding() {
        assert_eq!(
            compose_url_path("/_search", &pairs(&[("q", "a b")])),
            "/_search?q=a+b"
        );
    }
}
