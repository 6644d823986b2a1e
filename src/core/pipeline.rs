use crate::core::digest::DigestFormatter;
use crate::core::novelty::partition;
use crate::core::{
    Extracted, LedgerStore, ListingSource, Mailer, OutboundMessage, Pipeline, RunReport,
    SearchQuery, Transformed,
};
use crate::utils::error::Result;
use chrono::NaiveDateTime;

/// fetch → dedup → render → deliver → commit, one run at a time.
///
/// Two pipelines must never share a ledger concurrently: commits replace the
/// whole file and the last writer wins.
pub struct DigestPipeline<L: LedgerStore, F: ListingSource, M: Mailer> {
    ledger: L,
    source: F,
    mailer: M,
    query: SearchQuery,
    recipient: String,
    formatter: DigestFormatter,
}

impl<L: LedgerStore, F: ListingSource, M: Mailer> DigestPipeline<L, F, M> {
    pub fn new(
        ledger: L,
        source: F,
        mailer: M,
        query: SearchQuery,
        recipient: String,
        formatter: DigestFormatter,
    ) -> Self {
        Self {
            ledger,
            source,
            mailer,
            query,
            recipient,
            formatter,
        }
    }
}

#[async_trait::async_trait]
impl<L: LedgerStore, F: ListingSource, M: Mailer> Pipeline for DigestPipeline<L, F, M> {
    async fn extract(&self) -> Result<Extracted> {
        let ledger = self.ledger.load().await?;
        tracing::info!("Loaded {} previously sent listing ids", ledger.len());

        let listings = self.source.fetch(&self.query).await?;
        tracing::info!("Retrieved {} listings from the search API", listings.len());

        Ok(Extracted { ledger, listings })
    }

    fn transform(&self, extracted: Extracted, generated_at: NaiveDateTime) -> Transformed {
        let fetched = extracted.listings.len();
        let prior_ledger_size = extracted.ledger.len();
        let split = partition(extracted.listings, &extracted.ledger);

        let digest = if split.new.is_empty() {
            None
        } else {
            Some(
                self.formatter
                    .render(split.new, &self.query.terms, generated_at),
            )
        };

        Transformed {
            fetched,
            invalid: split.invalid,
            prior_ledger_size,
            updated_ledger: split.updated_ledger,
            digest,
        }
    }

    async fn load(&self, transformed: Transformed) -> Result<RunReport> {
        let mut report = RunReport {
            fetched: transformed.fetched,
            invalid: transformed.invalid,
            ledger_size: transformed.prior_ledger_size,
            ..RunReport::default()
        };

        let Some(digest) = transformed.digest else {
            tracing::info!("No new listings found, nothing to send");
            return Ok(report);
        };
        report.new_listings = digest.listing_count;

        let message = OutboundMessage {
            recipient: self.recipient.clone(),
            subject: digest.subject,
            body: digest.body,
        };
        if let Err(e) = self.mailer.send(&message).await {
            tracing::warn!(
                "Delivery failed, ledger left untouched so {} listings are retried next run: {}",
                report.new_listings,
                e
            );
            return Ok(report);
        }
        report.delivered = true;

        match self.ledger.commit(&transformed.updated_ledger).await {
            Ok(()) => {
                report.ledger_committed = true;
                report.ledger_size = transformed.updated_ledger.len();
            }
            Err(e) => {
                // Listings will be re-sent next run; duplicates beat losing them.
                tracing::error!("Digest sent but ledger commit failed: {}", e);
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::digest::DigestSettings;
    use crate::core::{Ledger, Listing};
    use crate::utils::error::{DeliveryError, DigestError, FetchError, LedgerError};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockLedger {
        stored: Arc<Mutex<Ledger>>,
        commits: Arc<Mutex<usize>>,
        fail_commit: bool,
    }

    impl MockLedger {
        fn with(ids: &[&str]) -> Self {
            Self {
                stored: Arc::new(Mutex::new(ids.iter().map(|s| s.to_string()).collect())),
                ..Self::default()
            }
        }

        async fn snapshot(&self) -> Ledger {
            self.stored.lock().await.clone()
        }

        async fn commit_count(&self) -> usize {
            *self.commits.lock().await
        }
    }

    impl LedgerStore for MockLedger {
        async fn load(&self) -> std::result::Result<Ledger, LedgerError> {
            Ok(self.stored.lock().await.clone())
        }

        async fn commit(&self, ids: &Ledger) -> std::result::Result<(), LedgerError> {
            if self.fail_commit {
                return Err(LedgerError::Write {
                    path: "mock".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            *self.stored.lock().await = ids.clone();
            *self.commits.lock().await += 1;
            Ok(())
        }
    }

    struct StaticSource {
        listings: Vec<Listing>,
    }

    #[async_trait]
    impl ListingSource for StaticSource {
        async fn fetch(
            &self,
            _query: &SearchQuery,
        ) -> std::result::Result<Vec<Listing>, FetchError> {
            Ok(self.listings.clone())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl ListingSource for BrokenSource {
        async fn fetch(
            &self,
            _query: &SearchQuery,
        ) -> std::result::Result<Vec<Listing>, FetchError> {
            Err(FetchError::Decode(
                serde_json::from_str::<serde_json::Value>("<html>").unwrap_err(),
            ))
        }
    }

    #[derive(Clone, Default)]
    struct MockMailer {
        sent: Arc<Mutex<Vec<OutboundMessage>>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for MockMailer {
        async fn send(&self, message: &OutboundMessage) -> std::result::Result<(), DeliveryError> {
            if self.fail {
                return Err(DeliveryError::Rejected("535 authentication failed".to_string()));
            }
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }

    fn query() -> SearchQuery {
        SearchQuery {
            terms: "Tester".to_string(),
            location: None,
            distance_km: None,
            title_only: true,
        }
    }

    fn sample_listings() -> Vec<Listing> {
        vec![
            Listing {
                location: Some("Warsaw, PL".to_string()),
                ..Listing::new("job1", "Tester")
            },
            Listing::new("job2", "Python Backend Developer"),
        ]
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn pipeline<F: ListingSource>(
        ledger: MockLedger,
        source: F,
        mailer: MockMailer,
    ) -> DigestPipeline<MockLedger, F, MockMailer> {
        DigestPipeline::new(
            ledger,
            source,
            mailer,
            query(),
            "me@example.com".to_string(),
            DigestFormatter::new(DigestSettings::default()),
        )
    }

    async fn run<F: ListingSource>(p: &DigestPipeline<MockLedger, F, MockMailer>) -> Result<RunReport> {
        let extracted = p.extract().await?;
        let transformed = p.transform(extracted, now());
        p.load(transformed).await
    }

    #[tokio::test]
    async fn test_new_listing_is_sent_and_committed() {
        let ledger = MockLedger::with(&["job2"]);
        let mailer = MockMailer::default();
        let p = pipeline(
            ledger.clone(),
            StaticSource {
                listings: sample_listings(),
            },
            mailer.clone(),
        );

        let report = run(&p).await.unwrap();

        assert_eq!(report.fetched, 2);
        assert_eq!(report.new_listings, 1);
        assert!(report.delivered);
        assert!(report.ledger_committed);
        assert_eq!(report.ledger_size, 2);

        let sent = mailer.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "me@example.com");
        assert!(sent[0].subject.contains('1'));
        assert_eq!(sent[0].body.matches("Title: ").count(), 1);
        assert!(sent[0].body.contains("Title: Tester"));
        drop(sent);

        let expected: Ledger = ["job1", "job2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(ledger.snapshot().await, expected);
    }

    #[tokio::test]
    async fn test_nothing_new_skips_delivery() {
        let ledger = MockLedger::with(&["job1", "job2"]);
        let mailer = MockMailer::default();
        let p = pipeline(
            ledger.clone(),
            StaticSource {
                listings: sample_listings(),
            },
            mailer.clone(),
        );

        let report = run(&p).await.unwrap();

        assert_eq!(report.new_listings, 0);
        assert!(!report.delivered);
        assert!(!report.delivery_failed());
        assert!(mailer.sent.lock().await.is_empty());
        assert_eq!(ledger.commit_count().await, 0);
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_ledger() {
        let ledger = MockLedger::with(&["job2"]);
        let mailer = MockMailer {
            fail: true,
            ..MockMailer::default()
        };
        let p = pipeline(
            ledger.clone(),
            StaticSource {
                listings: sample_listings(),
            },
            mailer,
        );

        let report = run(&p).await.unwrap();

        assert!(report.delivery_failed());
        assert!(!report.ledger_committed);
        assert_eq!(ledger.commit_count().await, 0);
        let expected: Ledger = ["job2".to_string()].into_iter().collect();
        assert_eq!(ledger.snapshot().await, expected);
    }

    #[tokio::test]
    async fn test_commit_failure_still_completes_run() {
        let ledger = MockLedger {
            fail_commit: true,
            ..MockLedger::with(&[])
        };
        let mailer = MockMailer::default();
        let p = pipeline(
            ledger,
            StaticSource {
                listings: sample_listings(),
            },
            mailer.clone(),
        );

        let report = run(&p).await.unwrap();

        assert!(report.delivered);
        assert!(!report.ledger_committed);
        assert_eq!(mailer.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_before_delivery() {
        let ledger = MockLedger::with(&["job2"]);
        let mailer = MockMailer::default();
        let p = pipeline(ledger.clone(), BrokenSource, mailer.clone());

        let result = run(&p).await;

        assert!(matches!(result, Err(DigestError::Fetch(FetchError::Decode(_)))));
        assert!(mailer.sent.lock().await.is_empty());
        assert_eq!(ledger.commit_count().await, 0);
    }
}
