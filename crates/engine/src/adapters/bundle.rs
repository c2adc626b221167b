//! Loading of pinned certificate material shipped alongside an application.
//!
//! Files that do not decode as certificates are skipped; only an unusable
//! directory or a failing read is reported as an error.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::debug;
use x509_parser::pem::Pem;

use crate::crypto::key_extractor::decode_certificate;
use crate::domain::error::{EngineError, EngineResult};
use crate::domain::types::EngineDefaults;

const PEM_CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Every decodable certificate in `dir` with a recognised extension
/// (`cer`, `der`, `crt`, `pem`, any case), as DER, in file name order.
pub fn certificates_in_dir(dir: &Path) -> EngineResult<Vec<Vec<u8>>> {
  if !dir.is_dir() {
    return Err(EngineError::Config(format!(
      "certificate directory not found: {}",
      dir.display()
    )));
  }
  let dir_str = dir
    .to_str()
    .ok_or_else(|| EngineError::Config("certificate directory path must be valid UTF-8".into()))?;
  let base = Pattern::escape(dir_str);
  let options = MatchOptions {
    case_sensitive: false,
    ..MatchOptions::new()
  };

  let mut paths: Vec<PathBuf> = Vec::new();
  for ext in EngineDefaults::CERTIFICATE_EXTENSIONS {
    let pattern = format!("{base}/*.{ext}");
    for entry in glob::glob_with(&pattern, options)? {
      match entry {
        Ok(path) if path.is_file() => paths.push(path),
        Ok(_) => {}
        Err(e) => debug!(error = %e, "skipping unreadable bundle entry"),
      }
    }
  }
  paths.sort();
  paths.dedup();

  let mut certificates = Vec::new();
  for path in paths {
    let bytes = std::fs::read(&path)?;
    let found = certificates_from_bytes(&bytes);
    if found.is_empty() {
      debug!(path = %path.display(), "no decodable certificate in bundle file");
    }
    certificates.extend(found);
  }
  Ok(certificates)
}

/// Decode `CERTIFICATE` blocks from PEM text, skipping anything unusable.
pub fn certificates_from_pem(pem: &[u8]) -> Vec<Vec<u8>> {
  Pem::iter_from_buffer(pem)
    .map_while(Result::ok)
    .filter(|block| block.label == PEM_CERTIFICATE_LABEL)
    .map(|block| block.contents)
    .filter(|der| is_certificate(der))
    .collect()
}

/// Certificates in a file's contents, which may be DER or PEM.
pub fn certificates_from_bytes(bytes: &[u8]) -> Vec<Vec<u8>> {
  if looks_like_pem(bytes) {
    certificates_from_pem(bytes)
  } else if is_certificate(bytes) {
    vec![bytes.to_vec()]
  } else {
    Vec::new()
  }
}

fn looks_like_pem(bytes: &[u8]) -> bool {
  let start = bytes
    .iter()
    .position(|b| !b.is_ascii_whitespace())
    .unwrap_or(bytes.len());
  bytes[start..].starts_with(b"-----BEGIN")
}

fn is_certificate(der: &[u8]) -> bool {
  decode_certificate(der).is_ok()
}
