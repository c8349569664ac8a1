use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::error::TransportError;

/// Default node host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default node HTTP port.
pub const DEFAULT_PORT: u16 = 9200;

/// Default per-request timeout, also used as the pool's connect timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Content type sent when the caller did not supply one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Configuration for a single node connection.
///
/// Constructed once and consumed by
/// [`NodeConnection::new`](crate::NodeConnection::new); all validation
/// happens at construction time, and a bad combination of fields fails
/// before any session is created.
///
/// # Examples
///
/// ```
/// use search_transport::ConnectionConfig;
///
/// let config = ConnectionConfig {
///     host: "es01.internal".to_string(),
///     port: 9201,
///     use_ssl: true,
///     ..Default::default()
/// };
/// assert_eq!(config.url_prefix, "");
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Node hostname or IP address.
    pub host: String,

    /// Node port.
    pub port: u16,

    /// Path prefix prepended to every request path. Leading and trailing
    /// slashes are normalized away; the empty string means no prefix.
    pub url_prefix: String,

    /// HTTP basic-auth credentials, in any of the accepted input forms.
    pub http_auth: Option<HttpAuth>,

    /// Use https for the base URL. Implied by `ssl_context`.
    pub use_ssl: bool,

    /// Verify the server certificate. `None` means the flag was not
    /// supplied: TLS connections then verify against `ca_certs` (or the
    /// built-in webpki roots). `Some(false)` turns hostname and chain
    /// checks off entirely, which is insecure and emits a diagnostic.
    ///
    /// Supplying this flag (either value) together with `ssl_context` is a
    /// configuration error; supplying `Some(true)` or `ca_certs` without
    /// `ssl_context` is a deprecated path that derives a context internally.
    pub verify_certs: Option<bool>,

    /// PEM file with the CA certificates to trust. Deprecated in favor of a
    /// pre-built `ssl_context`.
    pub ca_certs: Option<PathBuf>,

    /// PEM file with the client certificate chain for mutual TLS.
    pub client_cert: Option<PathBuf>,

    /// PEM file with the client private key. Falls back to `client_cert`
    /// when absent (combined cert+key files).
    pub client_key: Option<PathBuf>,

    /// Cache DNS lookups in the transport layer.
    pub use_dns_cache: bool,

    /// Default headers sent with every request. A `content-type` of
    /// `application/json` is inserted if absent, never overridden.
    pub headers: HeaderMap,

    /// Pre-built TLS context, used as-is. Mutually exclusive with
    /// `verify_certs`/`ca_certs`; implies `use_ssl`.
    pub ssl_context: Option<rustls::ClientConfig>,

    /// Default deadline for requests without a per-call override.
    pub timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            url_prefix: String::new(),
            http_auth: None,
            use_ssl: false,
            verify_certs: None,
            ca_certs: None,
            client_cert: None,
            client_key: None,
            use_dns_cache: true,
            headers: HeaderMap::new(),
            ssl_context: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Accepted forms of HTTP basic-auth input.
///
/// Resolved once at construction into [`Credentials`]; input that cannot be
/// resolved is rejected with a configuration error rather than passed
/// through unexamined.
#[derive(Clone)]
pub enum HttpAuth {
    /// Combined `"user:password"` form, split on the first colon.
    UserPass(String),

    /// Separate username and password.
    Pair(String, String),

    /// Already-resolved credentials.
    Credentials(Credentials),
}

impl HttpAuth {
    /// Normalizes the input to canonical [`Credentials`].
    pub(crate) fn resolve(&self) -> Result<Credentials, TransportError> {
        match self {
            HttpAuth::UserPass(combined) => match combined.split_once(':') {
                Some((username, password)) => Ok(Credentials {
                    username: username.to_string(),
                    password: password.to_string(),
                }),
                None => Err(TransportError::Configuration(
                    "`http_auth` string must have the form \"user:password\"".to_string(),
                )),
            },
            HttpAuth::Pair(username, password) => Ok(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            HttpAuth::Credentials(credentials) => Ok(credentials.clone()),
        }
    }
}

impl fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpAuth::UserPass(_) => f.write_str("HttpAuth::UserPass(<redacted>)"),
            HttpAuth::Pair(username, _) => f
                .debug_tuple("HttpAuth::Pair")
                .field(username)
                .field(&"<redacted>")
                .finish(),
            HttpAuth::Credentials(credentials) => f
                .debug_tuple("HttpAuth::Credentials")
                .field(credentials)
                .finish(),
        }
    }
}

/// Canonical basic-auth credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username, sent verbatim.
    pub username: String,
    /// Password, sent verbatim. Redacted from `Debug` output.
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
