pub mod hostname;
pub mod key_extractor;
