use std::sync::RwLock;
use std::time::Duration;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;

use crate::config::{ConnectionConfig, Credentials, HttpAuth, DEFAULT_CONTENT_TYPE};
use crate::error::TransportError;
use crate::tls::ResolvedTls;

/// Long-lived session bound to one base URL.
///
/// Owns the pooled transport handle, the resolved credentials and the
/// default timeout. The handle lives behind a lock so `close()` can drop it
/// (releasing every pooled connection) while concurrent requests keep
/// working on their own cheap clones.
pub(crate) struct Session {
    client: RwLock<Option<Client>>,
    base_url: String,
    credentials: Option<Credentials>,
    default_timeout: Duration,
}

impl Session {
    /// Builds the pooled client and the immutable base URL.
    pub(crate) fn open(config: &ConnectionConfig, tls: ResolvedTls) -> Result<Self, TransportError> {
        let credentials = config
            .http_auth
            .as_ref()
            .map(HttpAuth::resolve)
            .transpose()?;

        let mut headers = config.headers.clone();
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.timeout)
            .hickory_dns(config.use_dns_cache);
        if let Some(context) = tls.context {
            builder = builder.use_preconfigured_tls(context);
        }
        let client = builder.build().map_err(|e| {
            TransportError::Configuration(format!("unable to build HTTP client: {e}"))
        })?;

        let base_url = compose_base_url(&config.host, config.port, &config.url_prefix, tls.use_ssl);

        Ok(Session {
            client: RwLock::new(Some(client)),
            base_url,
            credentials,
            default_timeout: config.timeout,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub(crate) fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Clones the pooled handle out of the lock, so no guard is ever held
    /// across an await point.
    pub(crate) fn client(&self) -> Result<Client, TransportError> {
        let guard = self.client.read().unwrap_or_else(|e| e.into_inner());
        guard.clone().ok_or(TransportError::Closed)
    }

    /// Drops the pooled handle, releasing its connections. Safe to call
    /// twice; requests issued afterwards fail with
    /// [`TransportError::Closed`].
    pub(crate) fn close(&self) {
        let mut guard = self.client.write().unwrap_or_else(|e| e.into_inner());
        guard.take();
    }
}

/// `http[s]://host:port/url_prefix`. An empty prefix renders as a bare
/// trailing slash; a non-empty one as `/prefix` with no trailing slash.
fn compose_base_url(host: &str, port: u16, url_prefix: &str, use_ssl: bool) -> String {
    let scheme = if use_ssl { "https" } else { "http" };
    let trimmed = url_prefix.trim_matches('/');
    if trimmed.is_empty() {
        format!("{scheme}://{host}:{port}/")
    } else {
        format!("{scheme}://{host}:{port}/{trimmed}")
    }
}
