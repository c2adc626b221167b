// Re-export all types so callers can keep using `domain::types::*`.

pub use self::core::*;
pub use config::*;
pub use policy::*;
pub use trust::*;

// Module declarations
mod core;
mod config;
mod policy;
mod trust;
