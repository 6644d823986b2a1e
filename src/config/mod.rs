#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub use toml_config::{DigestConfig, Secret};
