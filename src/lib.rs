pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;
pub use config::DigestConfig;

pub use adapters::{http::AdzunaClient, mail::SmtpMailer, storage::FileLedger};
pub use crate::core::{
    engine::{DigestEngine, RunOutcome, RunPolicy},
    pipeline::DigestPipeline,
};
pub use utils::error::{DigestError, Result};
