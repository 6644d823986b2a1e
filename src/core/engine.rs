use crate::core::{Pipeline, RunReport};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use chrono::{Datelike, NaiveDateTime, Weekday};

/// Caller-side policy deciding whether a run happens at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunPolicy {
    pub skip_weekends: bool,
}

impl RunPolicy {
    pub fn skip_reason(&self, now: NaiveDateTime) -> Option<String> {
        if self.skip_weekends && matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
            return Some(format!("{} is a weekend day", now.date()));
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Skipped { reason: String },
    Completed(RunReport),
}

pub struct DigestEngine<P: Pipeline> {
    pipeline: P,
    policy: RunPolicy,
    monitor: SystemMonitor,
}

impl<P: Pipeline> DigestEngine<P> {
    pub fn new(pipeline: P, policy: RunPolicy) -> Self {
        Self::new_with_monitoring(pipeline, policy, false)
    }

    pub fn new_with_monitoring(pipeline: P, policy: RunPolicy, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            policy,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// Runs the pipeline once. `now` is only used for the weekend policy and
    /// the digest header.
    pub async fn run(&self, now: NaiveDateTime) -> Result<RunOutcome> {
        if let Some(reason) = self.policy.skip_reason(now) {
            tracing::info!("⏭️ Skipping listing check: {}", reason);
            return Ok(RunOutcome::Skipped { reason });
        }

        tracing::info!("🚀 Checking for new job listings");
        self.monitor.log_stats("Start");

        let extracted = self.pipeline.extract().await?;
        self.monitor.log_stats("Extract");

        let transformed = self.pipeline.transform(extracted, now);
        self.monitor.log_stats("Transform");

        let report = self.pipeline.load(transformed).await?;
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        tracing::info!(
            "Run finished: fetched {}, new {}, delivered {}, ledger committed {} ({} ids)",
            report.fetched,
            report.new_listings,
            report.delivered,
            report.ledger_committed,
            report.ledger_size
        );
        Ok(RunOutcome::Completed(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Extracted, Ledger, Listing, Transformed};
    use crate::utils::error::{DigestError, FetchError};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct CountingPipeline {
        extracts: Arc<AtomicUsize>,
        loads: Arc<AtomicUsize>,
        fail_extract: bool,
    }

    #[async_trait::async_trait]
    impl Pipeline for CountingPipeline {
        async fn extract(&self) -> Result<Extracted> {
            self.extracts.fetch_add(1, Ordering::SeqCst);
            if self.fail_extract {
                let source = serde_json::from_str::<serde_json::Value>("").unwrap_err();
                return Err(DigestError::Fetch(FetchError::Decode(source)));
            }
            Ok(Extracted {
                ledger: Ledger::new(),
                listings: vec![Listing::new("job1", "Tester")],
            })
        }

        fn transform(&self, extracted: Extracted, _generated_at: NaiveDateTime) -> Transformed {
            Transformed {
                fetched: extracted.listings.len(),
                invalid: 0,
                prior_ledger_size: extracted.ledger.len(),
                updated_ledger: extracted.ledger,
                digest: None,
            }
        }

        async fn load(&self, transformed: Transformed) -> Result<RunReport> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(RunReport {
                fetched: transformed.fetched,
                ..RunReport::default()
            })
        }
    }

    fn on(day: u32) -> NaiveDateTime {
        // March 2025: the 3rd is a Monday, the 8th a Saturday.
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_policy_skips_only_weekends() {
        let policy = RunPolicy {
            skip_weekends: true,
        };
        assert!(policy.skip_reason(on(3)).is_none());
        assert!(policy.skip_reason(on(7)).is_none());
        assert!(policy.skip_reason(on(8)).is_some());
        assert!(policy.skip_reason(on(9)).is_some());
        assert!(RunPolicy::default().skip_reason(on(8)).is_none());
    }

    #[tokio::test]
    async fn test_weekday_run_executes_all_phases() {
        let pipeline = CountingPipeline::default();
        let engine = DigestEngine::new(
            pipeline.clone(),
            RunPolicy {
                skip_weekends: true,
            },
        );

        let outcome = engine.run(on(3)).await.unwrap();

        assert!(matches!(outcome, RunOutcome::Completed(ref r) if r.fetched == 1));
        assert_eq!(pipeline.extracts.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_weekend_run_is_skipped_without_fetching() {
        let pipeline = CountingPipeline::default();
        let engine = DigestEngine::new(
            pipeline.clone(),
            RunPolicy {
                skip_weekends: true,
            },
        );

        let outcome = engine.run(on(8)).await.unwrap();

        assert!(matches!(outcome, RunOutcome::Skipped { .. }));
        assert_eq!(pipeline.extracts.load(Ordering::SeqCst), 0);
        assert_eq!(pipeline.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_extract_failure_stops_the_run() {
        let pipeline = CountingPipeline {
            fail_extract: true,
            ..CountingPipeline::default()
        };
        let engine = DigestEngine::new(pipeline.clone(), RunPolicy::default());

        let result = engine.run(on(8)).await;

        assert!(result.is_err());
        assert_eq!(pipeline.loads.load(Ordering::SeqCst), 0);
    }
}
