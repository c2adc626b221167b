// crates/engine/src/domain/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  /// A byte blob that should hold a DER certificate did not decode.
  #[error("malformed certificate: {0}")]
  MalformedCertificate(String),

  #[error("configuration: {0}")]
  Config(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Glob(#[from] glob::PatternError),

  #[cfg(feature = "rustls")]
  #[error("tls: {0}")]
  Tls(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
