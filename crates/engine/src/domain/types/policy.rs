use std::collections::HashSet;

use once_cell::sync::OnceCell;
use tracing::debug;

use super::config::EngineDefaults;
use super::core::PinningMode;
use crate::crypto::key_extractor::{decode_certificate, extract_public_key, PublicKeyBytes};

/// Pinned certificate material plus the invalid-chain tolerance that only
/// makes sense once something is pinned.
///
/// The comparison sets (well-formed certificates, extracted public keys) are
/// computed on first use and never change afterwards.
#[derive(Debug, Clone, Default)]
pub struct PinSet {
    certificates: HashSet<Vec<u8>>,
    allow_invalid_certificates: bool,
    well_formed: OnceCell<HashSet<Vec<u8>>>,
    public_keys: OnceCell<HashSet<PublicKeyBytes>>,
}

impl PinSet {
    pub fn new<I>(certificates: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self {
            certificates: certificates.into_iter().collect(),
            allow_invalid_certificates: EngineDefaults::ALLOW_INVALID_CERTIFICATES,
            well_formed: OnceCell::new(),
            public_keys: OnceCell::new(),
        }
    }

    /// Trust chains the platform rejects as long as a pin matches.
    pub fn allowing_invalid_certificates(mut self, allow: bool) -> Self {
        self.allow_invalid_certificates = allow;
        self
    }

    pub fn certificates(&self) -> &HashSet<Vec<u8>> {
        &self.certificates
    }

    pub fn allows_invalid_certificates(&self) -> bool {
        self.allow_invalid_certificates
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Whether `der` is byte-for-byte one of the decodable pinned certificates.
    pub fn contains_certificate(&self, der: &[u8]) -> bool {
        self.well_formed_certificates().contains(der)
    }

    /// Public keys of every decodable pinned certificate.
    pub fn public_keys(&self) -> &HashSet<PublicKeyBytes> {
        self.public_keys.get_or_init(|| {
            self.certificates
                .iter()
                .filter_map(|der| match extract_public_key(der) {
                    Ok(key) => Some(key),
                    Err(e) => {
                        debug!(error = %e, "ignoring pinned certificate without a usable public key");
                        None
                    }
                })
                .collect()
        })
    }

    fn well_formed_certificates(&self) -> &HashSet<Vec<u8>> {
        self.well_formed.get_or_init(|| {
            self.certificates
                .iter()
                .filter(|der| match decode_certificate(der) {
                    Ok(_) => true,
                    Err(e) => {
                        debug!(error = %e, "ignoring malformed pinned certificate");
                        false
                    }
                })
                .cloned()
                .collect()
        })
    }
}

/// Pinning mode tagged with the material it needs.
#[derive(Debug, Clone, Default)]
pub enum Pinning {
    #[default]
    None,
    PublicKey(PinSet),
    Certificate(PinSet),
}

impl Pinning {
    /// Tag `pins` with `mode`. Pins given together with `PinningMode::None`
    /// are dropped since nothing would ever consult them.
    pub fn new(mode: PinningMode, pins: PinSet) -> Self {
        match mode {
            PinningMode::None => Pinning::None,
            PinningMode::PublicKey => Pinning::PublicKey(pins),
            PinningMode::Certificate => Pinning::Certificate(pins),
        }
    }

    pub fn mode(&self) -> PinningMode {
        match self {
            Pinning::None => PinningMode::None,
            Pinning::PublicKey(_) => PinningMode::PublicKey,
            Pinning::Certificate(_) => PinningMode::Certificate,
        }
    }

    pub fn pins(&self) -> Option<&PinSet> {
        match self {
            Pinning::None => None,
            Pinning::PublicKey(pins) | Pinning::Certificate(pins) => Some(pins),
        }
    }
}

/// Immutable security policy consulted for every server trust challenge.
///
/// Build it once and share it (`Arc<SecurityPolicy>`) with every connection
/// that needs it; there is no way to change a policy after construction.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    pinning: Pinning,
    validates_domain_name: bool,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self::default_policy()
    }
}

impl SecurityPolicy {
    /// No pinning, invalid chains rejected, domain names validated.
    pub fn default_policy() -> Self {
        Self {
            pinning: Pinning::None,
            validates_domain_name: EngineDefaults::VALIDATES_DOMAIN_NAME,
        }
    }

    /// Policy for `mode` with nothing pinned yet. Any mode other than
    /// `PinningMode::None` rejects every connection until built with pins.
    pub fn with_pinning_mode(mode: PinningMode) -> Self {
        Self::with_pinned_certificates(mode, Vec::new())
    }

    pub fn with_pinned_certificates<I>(mode: PinningMode, certificates: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self::from_pinning(Pinning::new(mode, PinSet::new(certificates)))
    }

    pub fn from_pinning(pinning: Pinning) -> Self {
        Self {
            pinning,
            validates_domain_name: EngineDefaults::VALIDATES_DOMAIN_NAME,
        }
    }

    pub fn validating_domain_name(mut self, validate: bool) -> Self {
        self.validates_domain_name = validate;
        self
    }

    pub fn pinning(&self) -> &Pinning {
        &self.pinning
    }

    pub fn mode(&self) -> PinningMode {
        self.pinning.mode()
    }

    /// Pinned certificates as supplied. Empty for `PinningMode::None`.
    pub fn pinned_certificates(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.pinning
            .pins()
            .into_iter()
            .flat_map(|pins| pins.certificates().iter().map(Vec::as_slice))
    }

    /// Always false for `PinningMode::None`, which ignores chain tolerance.
    pub fn allows_invalid_certificates(&self) -> bool {
        self.pinning
            .pins()
            .map(PinSet::allows_invalid_certificates)
            .unwrap_or(false)
    }

    pub fn validates_domain_name(&self) -> bool {
        self.validates_domain_name
    }
}
