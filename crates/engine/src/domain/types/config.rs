use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::{Host, Url};

use super::core::PinningMode;
use super::policy::{PinSet, Pinning, SecurityPolicy};
use crate::adapters::bundle::{certificates_from_pem, certificates_in_dir};
use crate::domain::error::{EngineError, EngineResult};

/// Centralized defaults for the pinning engine.
/// All opinionated defaults should be defined here for consistency.
pub struct EngineDefaults;

impl EngineDefaults {
    // Security defaults
    pub const PINNING_MODE: PinningMode = PinningMode::None; // Platform CA validation only
    pub const ALLOW_INVALID_CERTIFICATES: bool = false; // Never rescue a distrusted chain
    pub const VALIDATES_DOMAIN_NAME: bool = true; // Leaf must name the host

    // Bundle loading
    pub const CERTIFICATE_EXTENSIONS: [&'static str; 4] = ["cer", "der", "crt", "pem"];

    // Reachability
    pub const REACHABILITY_CHANNEL_CAPACITY: usize = 16;
}

fn default_validates_domain_name() -> bool {
    EngineDefaults::VALIDATES_DOMAIN_NAME
}

/// Serializable policy description, e.g. from an app's JSON settings.
///
/// Pinned material comes from a directory of certificate files, from inline
/// PEM text, or from both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default)]
    pub mode: PinningMode,
    #[serde(default)]
    pub allow_invalid_certificates: bool,
    #[serde(default = "default_validates_domain_name")]
    pub validates_domain_name: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_certificates_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_certificates_pem: Option<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            mode: EngineDefaults::PINNING_MODE,
            allow_invalid_certificates: EngineDefaults::ALLOW_INVALID_CERTIFICATES,
            validates_domain_name: EngineDefaults::VALIDATES_DOMAIN_NAME,
            pinned_certificates_dir: None,
            pinned_certificates_pem: None,
        }
    }
}

impl PolicyConfig {
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the immutable policy, loading any referenced certificates.
    pub fn into_policy(self) -> EngineResult<SecurityPolicy> {
        self.into_policy_with_certificates(Vec::new())
    }

    /// Like [`Self::into_policy`], pinning `certificates` in addition to the
    /// configured directory and PEM text.
    pub fn into_policy_with_certificates<I>(self, certificates: I) -> EngineResult<SecurityPolicy>
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        if self.mode == PinningMode::None {
            if self.allow_invalid_certificates {
                return Err(EngineError::Config(
                    "allow_invalid_certificates requires a pinning mode".into(),
                ));
            }
            return Ok(SecurityPolicy::default_policy()
                .validating_domain_name(self.validates_domain_name));
        }

        let mut certificates: Vec<Vec<u8>> = certificates.into_iter().collect();
        if let Some(dir) = &self.pinned_certificates_dir {
            certificates.extend(certificates_in_dir(dir)?);
        }
        if let Some(pem) = &self.pinned_certificates_pem {
            certificates.extend(certificates_from_pem(pem.as_bytes()));
        }

        let pins = PinSet::new(certificates).allowing_invalid_certificates(self.allow_invalid_certificates);
        Ok(SecurityPolicy::from_pinning(Pinning::new(self.mode, pins))
            .validating_domain_name(self.validates_domain_name))
    }
}

/// Host of `url` as it should be checked against the leaf certificate.
/// IPv6 literals are returned without brackets.
pub fn domain_from_url(url: &str) -> EngineResult<Option<String>> {
    let url = Url::parse(url).map_err(|e| EngineError::Config(format!("invalid URL: {e}")))?;
    Ok(url.host().map(|host| match host {
        Host::Domain(d) => d.to_string(),
        Host::Ipv4(a) => a.to_string(),
        Host::Ipv6(a) => a.to_string(),
    }))
}
