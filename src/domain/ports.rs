use crate::domain::model::{
    Extracted, Ledger, Listing, OutboundMessage, RunReport, SearchQuery, Transformed,
};
use crate::utils::error::{DeliveryError, FetchError, LedgerError, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;

/// Durable set of delivered listing ids.
pub trait LedgerStore: Send + Sync {
    /// Missing storage is a first run and yields an empty ledger.
    fn load(&self) -> impl std::future::Future<Output = std::result::Result<Ledger, LedgerError>> + Send;

    /// Replaces the stored set wholesale. A failed commit must leave the
    /// previous content readable.
    fn commit(
        &self,
        ids: &Ledger,
    ) -> impl std::future::Future<Output = std::result::Result<(), LedgerError>> + Send;
}

#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch(&self, query: &SearchQuery) -> std::result::Result<Vec<Listing>, FetchError>;
}

/// Outbound message channel. One attempt per call, no retries.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> std::result::Result<(), DeliveryError>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Extracted>;
    fn transform(&self, extracted: Extracted, generated_at: NaiveDateTime) -> Transformed;
    async fn load(&self, transformed: Transformed) -> Result<RunReport>;
}
