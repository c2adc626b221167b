// crates/engine/src/domain/evaluator.rs
use serde::Serialize;
use tracing::{debug, trace, warn};

use super::types::{PinSet, Pinning, SecurityPolicy, ServerTrust};
use crate::crypto::key_extractor::extract_public_key;

/// Why a server trust was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The leaf certificate is not issued for the requested domain.
    DomainMismatch,
    /// The platform distrusts the chain and the policy does not tolerate that.
    DefaultTrustInvalid,
    /// Pinning is enabled but nothing is pinned.
    NoPinnedCertificates,
    /// No presented certificate or key is pinned.
    NoPinMatch,
}

/// Outcome of evaluating a server trust against a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum TrustDecision {
    Accepted,
    Rejected(RejectReason),
}

impl TrustDecision {
    pub fn is_accepted(self) -> bool {
        matches!(self, TrustDecision::Accepted)
    }
}

/// Evaluate `trust` under `policy`; `true` means proceed with the connection.
///
/// Never fails: malformed certificates simply do not match.
pub fn evaluate(policy: &SecurityPolicy, trust: &dyn ServerTrust, domain: Option<&str>) -> bool {
    evaluate_detailed(policy, trust, domain).is_accepted()
}

pub fn evaluate_detailed(
    policy: &SecurityPolicy,
    trust: &dyn ServerTrust,
    domain: Option<&str>,
) -> TrustDecision {
    let decision = decide(policy, trust, domain);
    match decision {
        TrustDecision::Accepted => trace!(mode = %policy.mode(), ?domain, "server trust accepted"),
        TrustDecision::Rejected(reason) => {
            debug!(mode = %policy.mode(), ?domain, ?reason, "server trust rejected")
        }
    }
    decision
}

fn decide(policy: &SecurityPolicy, trust: &dyn ServerTrust, domain: Option<&str>) -> TrustDecision {
    if policy.validates_domain_name() {
        if let Some(domain) = domain.filter(|d| !d.is_empty()) {
            if !trust.matches_domain(domain) {
                return TrustDecision::Rejected(RejectReason::DomainMismatch);
            }
        }
    }

    let (pins, by_certificate) = match policy.pinning() {
        Pinning::None => {
            return if trust.is_default_valid() {
                TrustDecision::Accepted
            } else {
                TrustDecision::Rejected(RejectReason::DefaultTrustInvalid)
            };
        }
        Pinning::Certificate(pins) => (pins, true),
        Pinning::PublicKey(pins) => (pins, false),
    };

    if !pins.allows_invalid_certificates() && !trust.is_default_valid() {
        return TrustDecision::Rejected(RejectReason::DefaultTrustInvalid);
    }

    if pins.is_empty() {
        warn!(mode = %policy.mode(), "pinning enabled without pinned certificates; rejecting");
        return TrustDecision::Rejected(RejectReason::NoPinnedCertificates);
    }

    let matched = if by_certificate {
        chain_has_pinned_certificate(pins, trust.certificate_chain())
    } else {
        chain_has_pinned_key(pins, trust.certificate_chain())
    };

    if matched {
        TrustDecision::Accepted
    } else {
        TrustDecision::Rejected(RejectReason::NoPinMatch)
    }
}

fn chain_has_pinned_certificate(pins: &PinSet, chain: &[Vec<u8>]) -> bool {
    chain.iter().position(|der| pins.contains_certificate(der)).map_or(false, |depth| {
        trace!(depth, "pinned certificate found in chain");
        true
    })
}

fn chain_has_pinned_key(pins: &PinSet, chain: &[Vec<u8>]) -> bool {
    let pinned = pins.public_keys();
    if pinned.is_empty() {
        return false;
    }
    chain.iter().enumerate().any(|(depth, der)| match extract_public_key(der) {
        Ok(key) => {
            let hit = pinned.contains(&key);
            if hit {
                trace!(depth, key = %key.fingerprint(), "pinned public key found in chain");
            }
            hit
        }
        Err(e) => {
            debug!(depth, error = %e, "skipping malformed certificate in presented chain");
            false
        }
    })
}
