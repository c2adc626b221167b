use crate::crypto::hostname::certificate_matches_domain;

/// Server trust handed over by the TLS stack at challenge time.
///
/// Implementors own the platform side of validation: whether the chain
/// anchors to a trusted root with valid signatures and dates. The engine
/// only layers pinning on top of that answer.
pub trait ServerTrust {
    /// DER certificates as presented, leaf first.
    fn certificate_chain(&self) -> &[Vec<u8>];

    /// The platform's verdict on the chain, ignoring host names.
    fn is_default_valid(&self) -> bool;

    /// Whether the leaf certificate is issued for `domain`.
    fn matches_domain(&self, domain: &str) -> bool {
        self.certificate_chain()
            .first()
            .map(|leaf| certificate_matches_domain(leaf, domain))
            .unwrap_or(false)
    }
}

/// A chain together with an already computed platform verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateChainTrust {
    chain: Vec<Vec<u8>>,
    default_valid: bool,
}

impl CertificateChainTrust {
    pub fn new(chain: Vec<Vec<u8>>, default_valid: bool) -> Self {
        Self { chain, default_valid }
    }

    pub fn leaf(&self) -> Option<&[u8]> {
        self.chain.first().map(Vec::as_slice)
    }
}

impl ServerTrust for CertificateChainTrust {
    fn certificate_chain(&self) -> &[Vec<u8>] {
        &self.chain
    }

    fn is_default_valid(&self) -> bool {
        self.default_valid
    }
}

impl<T: ServerTrust + ?Sized> ServerTrust for &T {
    fn certificate_chain(&self) -> &[Vec<u8>] {
        (**self).certificate_chain()
    }

    fn is_default_valid(&self) -> bool {
        (**self).is_default_valid()
    }

    fn matches_domain(&self, domain: &str) -> bool {
        (**self).matches_domain(domain)
    }
}
