//! rustls `ServerCertVerifier` that applies a [`SecurityPolicy`] on top of the
//! webpki verifier.
//!
//! webpki supplies the default validity of the chain. A chain that only fails
//! the host name check still counts as valid here, because the policy decides
//! on host names itself (and may have domain validation turned off).

use std::sync::Arc;

use ::rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use ::rustls::client::WebPkiServerVerifier;
use ::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use ::rustls::{CertificateError, DigitallySignedStruct, Error as TlsError, RootCertStore, SignatureScheme};
use tracing::debug;

use crate::domain::error::{EngineError, EngineResult};
use crate::domain::evaluator::{evaluate_detailed, RejectReason, TrustDecision};
use crate::domain::types::{CertificateChainTrust, SecurityPolicy};

#[derive(Debug)]
pub struct PinningServerCertVerifier {
  policy: Arc<SecurityPolicy>,
  webpki: Arc<WebPkiServerVerifier>,
}

impl PinningServerCertVerifier {
  /// Verifier trusting `roots` by default, using the ring crypto provider.
  pub fn new(policy: Arc<SecurityPolicy>, roots: Arc<RootCertStore>) -> EngineResult<Self> {
    let provider = Arc::new(::rustls::crypto::ring::default_provider());
    let webpki = WebPkiServerVerifier::builder_with_provider(roots, provider)
      .build()
      .map_err(|e| EngineError::Tls(format!("building webpki verifier: {e}")))?;
    Ok(Self::with_webpki_verifier(policy, webpki))
  }

  pub fn with_webpki_verifier(policy: Arc<SecurityPolicy>, webpki: Arc<WebPkiServerVerifier>) -> Self {
    Self { policy, webpki }
  }

  pub fn policy(&self) -> &Arc<SecurityPolicy> {
    &self.policy
  }
}

fn is_name_only_failure(err: &TlsError) -> bool {
  matches!(
    err,
    TlsError::InvalidCertificate(CertificateError::NotValidForName)
      | TlsError::InvalidCertificate(CertificateError::NotValidForNameContext { .. })
  )
}

fn domain_of(server_name: &ServerName<'_>) -> Option<String> {
  match server_name {
    ServerName::DnsName(name) => Some(name.as_ref().to_string()),
    ServerName::IpAddress(ip) => Some(std::net::IpAddr::from(*ip).to_string()),
    _ => None,
  }
}

impl ServerCertVerifier for PinningServerCertVerifier {
  fn verify_server_cert(
    &self,
    end_entity: &CertificateDer<'_>,
    intermediates: &[CertificateDer<'_>],
    server_name: &ServerName<'_>,
    ocsp_response: &[u8],
    now: UnixTime,
  ) -> Result<ServerCertVerified, TlsError> {
    let default_error = match self
      .webpki
      .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
    {
      Ok(_) => None,
      Err(e) if is_name_only_failure(&e) => None,
      Err(e) => {
        debug!(error = %e, "webpki rejected presented chain");
        Some(e)
      }
    };

    let chain = std::iter::once(end_entity)
      .chain(intermediates)
      .map(|cert| cert.as_ref().to_vec())
      .collect();
    let trust = CertificateChainTrust::new(chain, default_error.is_none());
    let domain = domain_of(server_name);

    match evaluate_detailed(&self.policy, &trust, domain.as_deref()) {
      TrustDecision::Accepted => Ok(ServerCertVerified::assertion()),
      TrustDecision::Rejected(RejectReason::DomainMismatch) => {
        Err(TlsError::InvalidCertificate(CertificateError::NotValidForName))
      }
      TrustDecision::Rejected(RejectReason::DefaultTrustInvalid) => Err(default_error
        .unwrap_or(TlsError::InvalidCertificate(CertificateError::ApplicationVerificationFailure))),
      TrustDecision::Rejected(_) => Err(TlsError::InvalidCertificate(
        CertificateError::ApplicationVerificationFailure,
      )),
    }
  }

  fn verify_tls12_signature(
    &self,
    message: &[u8],
    cert: &CertificateDer<'_>,
    dss: &DigitallySignedStruct,
  ) -> Result<HandshakeSignatureValid, TlsError> {
    self.webpki.verify_tls12_signature(message, cert, dss)
  }

  fn verify_tls13_signature(
    &self,
    message: &[u8],
    cert: &CertificateDer<'_>,
    dss: &DigitallySignedStruct,
  ) -> Result<HandshakeSignatureValid, TlsError> {
    self.webpki.verify_tls13_signature(message, cert, dss)
  }

  fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
    self.webpki.supported_verify_schemes()
  }
}
