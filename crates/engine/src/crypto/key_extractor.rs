//! Public key extraction for public-key pinning.
//!
//! Keys are compared as their DER `SubjectPublicKeyInfo`, so two certificates
//! re-issued over the same key pair yield identical key bytes even though
//! their serials, validity and signatures differ.

use std::fmt;

use sha2::{Digest, Sha256};
use x509_parser::certificate::X509Certificate;

use crate::domain::error::{EngineError, EngineResult};

/// DER encoded `SubjectPublicKeyInfo` of a certificate.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKeyBytes(Vec<u8>);

impl PublicKeyBytes {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Lowercase hex SHA-256 of the key encoding, for logs and diagnostics.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.0))
    }
}

impl fmt::Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKeyBytes")
            .field("len", &self.0.len())
            .field("sha256", &self.fingerprint())
            .finish()
    }
}

impl AsRef<[u8]> for PublicKeyBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Decode a DER certificate. Trailing bytes after the certificate are an error.
pub fn decode_certificate(der: &[u8]) -> EngineResult<X509Certificate<'_>> {
    let (rest, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| EngineError::MalformedCertificate(e.to_string()))?;
    if !rest.is_empty() {
        return Err(EngineError::MalformedCertificate(format!(
            "{} trailing bytes after certificate",
            rest.len()
        )));
    }
    Ok(cert)
}

/// Extract the public key of a DER certificate.
pub fn extract_public_key(der: &[u8]) -> EngineResult<PublicKeyBytes> {
    let cert = decode_certificate(der)?;
    Ok(PublicKeyBytes(cert.tbs_certificate.subject_pki.raw.to_vec()))
}
