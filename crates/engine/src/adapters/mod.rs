pub mod bundle;

#[cfg(feature = "rustls")]
pub mod tls_verifier;
