//! Host name checks against a leaf certificate's SAN / CN.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tracing::debug;
use x509_parser::extensions::GeneralName;

use super::key_extractor::decode_certificate;
use crate::domain::error::{EngineError, EngineResult};

/// Names a certificate is issued for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateNames {
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub common_name: Option<String>,
}

pub fn certificate_names(der: &[u8]) -> EngineResult<CertificateNames> {
    let cert = decode_certificate(der)?;
    let mut names = CertificateNames::default();

    let san = cert
        .subject_alternative_name()
        .map_err(|e| EngineError::MalformedCertificate(format!("subjectAltName: {e}")))?;
    if let Some(san) = san {
        for name in &san.value.general_names {
            match name {
                GeneralName::DNSName(dns) => names.dns_names.push(dns.to_string()),
                GeneralName::IPAddress(raw) => {
                    if let Some(ip) = ip_from_octets(raw) {
                        names.ip_addresses.push(ip);
                    }
                }
                _ => {}
            }
        }
    }

    names.common_name = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string);

    Ok(names)
}

/// Whether the certificate in `der` is valid for `domain`.
/// A certificate that does not decode never matches.
pub fn certificate_matches_domain(der: &[u8], domain: &str) -> bool {
    match certificate_names(der) {
        Ok(names) => names.matches(domain),
        Err(e) => {
            debug!(error = %e, "leaf certificate unreadable for host name check");
            false
        }
    }
}

impl CertificateNames {
    pub fn matches(&self, domain: &str) -> bool {
        let literal = without_root_dot(domain);
        let literal = literal
            .strip_prefix('[')
            .and_then(|l| l.strip_suffix(']'))
            .unwrap_or(literal);
        if let Ok(ip) = literal.parse::<IpAddr>() {
            return self.ip_addresses.contains(&ip);
        }

        // CN is only consulted by certificates that predate DNS SANs.
        if self.dns_names.is_empty() {
            return self
                .common_name
                .as_deref()
                .map(|cn| hostname_matches(cn, domain))
                .unwrap_or(false);
        }
        self.dns_names.iter().any(|pattern| hostname_matches(pattern, domain))
    }
}

/// Case-insensitive match of `host` against `pattern`, which may start with
/// a single `*.` label standing for exactly one label of `host`.
pub fn hostname_matches(pattern: &str, host: &str) -> bool {
    let pattern = without_root_dot(pattern).to_ascii_lowercase();
    let host = without_root_dot(host).to_ascii_lowercase();
    if pattern.is_empty() || host.is_empty() {
        return false;
    }

    match pattern.strip_prefix("*.") {
        Some(suffix) => {
            // `*.com` style patterns are too broad to honour.
            if suffix.contains('*') || !suffix.contains('.') {
                return false;
            }
            match host.split_once('.') {
                Some((label, rest)) => !label.is_empty() && rest == suffix,
                None => false,
            }
        }
        None => !pattern.contains('*') && pattern == host,
    }
}

// Only one trailing dot names the DNS root; `example.com..` is not a host.
fn without_root_dot(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

fn ip_from_octets(raw: &[u8]) -> Option<IpAddr> {
    match raw.len() {
        4 => <[u8; 4]>::try_from(raw).ok().map(|o| IpAddr::V4(Ipv4Addr::from(o))),
        16 => <[u8; 16]>::try_from(raw).ok().map(|o| IpAddr::V6(Ipv6Addr::from(o))),
        _ => None,
    }
}
