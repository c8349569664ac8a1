use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use crate::config::ConnectionConfig;
use crate::error::TransportError;
use crate::observer::{Diagnostic, TransportObserver};

/// Outcome of TLS resolution: the context to install on the pooled client,
/// if any, and the normalized scheme flag ("context implies SSL").
pub(crate) struct ResolvedTls {
    pub(crate) context: Option<ClientConfig>,
    pub(crate) use_ssl: bool,
}

/// Resolves the TLS-related configuration into a context, exactly once at
/// construction.
///
/// Order matters: mutual exclusion is checked before anything else, the
/// plain-http early exit before CA validation, and verifier replacement
/// after the context (given or derived) exists.
pub(crate) fn resolve(
    config: &ConnectionConfig,
    observer: &dyn TransportObserver,
) -> Result<ResolvedTls, TransportError> {
    if config.ssl_context.is_some() && (config.verify_certs.is_some() || config.ca_certs.is_some())
    {
        return Err(TransportError::Configuration(
            "`verify_certs` and `ca_certs` are not permitted when `ssl_context` is provided"
                .to_string(),
        ));
    }

    if !config.use_ssl && config.ssl_context.is_none() {
        return Ok(ResolvedTls {
            context: None,
            use_ssl: false,
        });
    }

    if config.ssl_context.is_none()
        && config.verify_certs == Some(true)
        && config.ca_certs.is_none()
    {
        return Err(TransportError::Configuration(
            "root certificates are missing for certificate validation; \
             pass them via `ca_certs` or supply a pre-built `ssl_context`"
                .to_string(),
        ));
    }

    let mut context = match &config.ssl_context {
        Some(context) => context.clone(),
        None => {
            if config.verify_certs == Some(true) || config.ca_certs.is_some() {
                observer.on_diagnostic(&Diagnostic::DeprecatedTlsFlags);
            }
            derive_context(config)?
        }
    };

    if config.verify_certs == Some(false) {
        context
            .dangerous()
            .set_certificate_verifier(Arc::new(AcceptAnyCertificate));
        observer.on_diagnostic(&Diagnostic::InsecureConnection {
            host: config.host.clone(),
        });
    }

    Ok(ResolvedTls {
        context: Some(context),
        use_ssl: true,
    })
}

/// Builds a context from the certificate authority material: the `ca_certs`
/// PEM file when given, the built-in webpki roots otherwise, plus client
/// auth when a client certificate is configured.
fn derive_context(config: &ConnectionConfig) -> Result<ClientConfig, TransportError> {
    let mut roots = RootCertStore::empty();
    match &config.ca_certs {
        Some(path) => {
            for certificate in load_certificates(path)? {
                roots.add(certificate).map_err(|e| {
                    TransportError::Configuration(format!(
                        "invalid CA certificate in {}: {e}",
                        path.display()
                    ))
                })?;
            }
        }
        None => roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
    }

    let builder = ClientConfig::builder().with_root_certificates(roots);
    let context = match &config.client_cert {
        Some(cert_path) => {
            let chain = load_certificates(cert_path)?;
            let key_path = config.client_key.as_deref().unwrap_or(cert_path);
            let key = load_private_key(key_path)?;
            builder.with_client_auth_cert(chain, key).map_err(|e| {
                TransportError::Configuration(format!("invalid client certificate: {e}"))
            })?
        }
        None => builder.with_no_client_auth(),
    };
    Ok(context)
}

fn load_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>, TransportError> {
    let pem = std::fs::read(path).map_err(|e| {
        TransportError::Configuration(format!(
            "unable to read certificate file {}: {e}",
            path.display()
        ))
    })?;
    let certificates: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<Result<_, _>>()
        .map_err(|e| {
            TransportError::Configuration(format!(
                "unable to parse certificate file {}: {e}",
                path.display()
            ))
        })?;
    if certificates.is_empty() {
        return Err(TransportError::Configuration(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(certificates)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TransportError> {
    let pem = std::fs::read(path).map_err(|e| {
        TransportError::Configuration(format!(
            "unable to read private key file {}: {e}",
            path.display()
        ))
    })?;
    rustls_pemfile::private_key(&mut pem.as_slice())
        .map_err(|e| {
            TransportError::Configuration(format!(
                "unable to parse private key file {}: {e}",
                path.display()
            ))
        })?
        .ok_or_else(|| {
            TransportError::Configuration(format!("no private key found in {}", path.display()))
        })
}

/// Verifier installed when certificate verification is explicitly disabled:
/// accepts any certificate, any hostname, any signature.
#[derive(Debug)]
struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA1,
            SignatureScheme::ECDSA_SHA1_Legacy,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
            SignatureScheme::ED448,
        ]
    }
}
