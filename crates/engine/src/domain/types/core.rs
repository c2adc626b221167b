use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::EngineError;

/// The criteria by which server trust is evaluated against pinned material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinningMode {
    /// No pinning; the platform's default chain validity decides.
    #[default]
    None,
    /// Compare the public keys of the presented chain with the pinned ones.
    PublicKey,
    /// Compare the raw DER bytes of the presented chain with the pinned ones.
    Certificate,
}

impl PinningMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PinningMode::None => "none",
            PinningMode::PublicKey => "public_key",
            PinningMode::Certificate => "certificate",
        }
    }
}

impl fmt::Display for PinningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PinningMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(PinningMode::None),
            "public_key" | "publickey" => Ok(PinningMode::PublicKey),
            "certificate" => Ok(PinningMode::Certificate),
            other => Err(EngineError::Config(format!("unknown pinning mode: {other}"))),
        }
    }
}
