pub mod config;
pub mod errors;
pub mod fingerprint;
pub mod types;
