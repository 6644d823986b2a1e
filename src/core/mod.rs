pub mod digest;
pub mod engine;
pub mod novelty;
pub mod pipeline;

pub use crate::domain::model::{
    Digest, Extracted, Group, Ledger, Listing, Locality, OutboundMessage, RunReport, SalaryRange,
    SearchQuery, Transformed,
};
pub use crate::domain::ports::{LedgerStore, ListingSource, Mailer, Pipeline};
pub use crate::utils::error::Result;
