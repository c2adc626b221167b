// crates/engine/src/lib.rs

//! Public facade for the pinning engine.
//! Exposes a stable API and re-exports types for consumers (HTTP clients, FFI).

pub mod adapters;
pub mod crypto;
pub mod domain;

use std::path::Path;

use domain::error::EngineResult;
use domain::types::domain_from_url;

/// Decide whether a server trust challenge should be accepted.
/// `domain` of `None` (or empty) skips the host name check.
pub fn evaluate_server_trust(
    policy: &SecurityPolicy,
    trust: &dyn ServerTrust,
    domain: Option<&str>,
) -> bool {
    crate::domain::evaluator::evaluate(policy, trust, domain)
}

/// Same as [`evaluate_server_trust`], checking the host of `url`.
/// An unparsable URL, or one without a host while domain names are
/// validated, is rejected rather than evaluated without a host.
pub fn evaluate_server_trust_for_url(
    policy: &SecurityPolicy,
    trust: &dyn ServerTrust,
    url: &str,
) -> bool {
    match domain_from_url(url) {
        Ok(None) if policy.validates_domain_name() => {
            tracing::debug!(url, "URL has no host to validate; rejecting");
            false
        }
        Ok(host) => evaluate_server_trust(policy, trust, host.as_deref()),
        Err(e) => {
            tracing::debug!(error = %e, "cannot derive domain from URL; rejecting");
            false
        }
    }
}

/// Every decodable certificate in `dir`, ready to be pinned.
pub fn certificates_in_dir(dir: &Path) -> EngineResult<Vec<Vec<u8>>> {
    adapters::bundle::certificates_in_dir(dir)
}

// Re-exports for convenience
#[cfg(feature = "rustls")]
pub use adapters::tls_verifier::PinningServerCertVerifier;
pub use crypto::key_extractor::{extract_public_key, PublicKeyBytes};
pub use domain::error::EngineError;
pub use domain::evaluator::{evaluate_detailed, RejectReason, TrustDecision};
pub use domain::reachability::{
    ReachabilityChange, ReachabilityFlags, ReachabilityMonitor, ReachabilitySource, ReachabilityStatus,
    StatusCallback,
};
pub use domain::types::{
    CertificateChainTrust, EngineDefaults, PinSet, Pinning, PinningMode, PolicyConfig, SecurityPolicy,
    ServerTrust,
};
