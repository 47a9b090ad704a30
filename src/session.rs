use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::advisor::{AdvisoryContext, AdvisoryResponder};
use crate::analytics::{AnalysisReport, InsightEngine};
use crate::config::AnalyticsThresholds;
use crate::error::{AnalyticsError, Result};
use crate::source::TradeSource;
use crate::types::{sanitize_records, RejectedRecord, TradeRecord};

pub const DEFAULT_FETCH_LIMIT: usize = 1000;

type OwnerKey = (String, String);

/// Tracks which (user, strategy) pairs have an analysis running so the same
/// journal is never analyzed twice at once.
#[derive(Debug, Clone, Default)]
pub struct AnalysisGuard {
    in_flight: Arc<Mutex<HashSet<OwnerKey>>>,
}

impl AnalysisGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self, user_id: &str, strategy_id: &str) -> Result<InFlight> {
        let key = (user_id.to_string(), strategy_id.to_string());
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());

        if !in_flight.insert(key.clone()) {
            return Err(AnalyticsError::AlreadyInFlight {
                user_id: key.0,
                strategy_id: key.1,
            });
        }

        Ok(InFlight {
            in_flight: Arc::clone(&self.in_flight),
            key,
        })
    }

    pub fn is_in_flight(&self, user_id: &str, strategy_id: &str) -> bool {
        let in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.contains(&(user_id.to_string(), strategy_id.to_string()))
    }
}

/// Held for the duration of one analysis; releases the pair on drop.
#[derive(Debug)]
pub struct InFlight {
    in_flight: Arc<Mutex<HashSet<OwnerKey>>>,
    key: OwnerKey,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.key);
    }
}

/// Result of one service call: the report plus the trades it was built from.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    pub trades: Vec<TradeRecord>,
    pub rejected: Vec<RejectedRecord>,
}

impl AnalysisOutcome {
    pub fn context(&self, top_n: usize, sample: usize) -> AdvisoryContext {
        AdvisoryContext::build(&self.report, &self.trades, top_n, sample)
    }
}

/// Fetches a journal from the source, drops malformed records and runs the
/// engine, one analysis per (user, strategy) at a time.
pub struct InsightService {
    source: Arc<dyn TradeSource>,
    thresholds: Arc<AnalyticsThresholds>,
    guard: AnalysisGuard,
    fetch_limit: usize,
}

impl InsightService {
    pub fn new(source: Arc<dyn TradeSource>, thresholds: Arc<AnalyticsThresholds>) -> Self {
        Self {
            source,
            thresholds,
            guard: AnalysisGuard::new(),
            fetch_limit: DEFAULT_FETCH_LIMIT,
        }
    }

    pub fn with_fetch_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = limit;
        self
    }

    pub fn guard(&self) -> &AnalysisGuard {
        &self.guard
    }

    pub async fn analyze(&self, user_id: &str, strategy_id: &str) -> Result<AnalysisOutcome> {
        let _in_flight = self.guard.try_begin(user_id, strategy_id)?;

        let raw = self
            .source
            .fetch_trades(user_id, strategy_id, self.fetch_limit)
            .await
            .map_err(AnalyticsError::Source)?;
        debug!("Fetched {} raw records for {}/{}", raw.len(), user_id, strategy_id);

        let (trades, rejected) = sanitize_records(raw);
        let report = InsightEngine::analyze(&trades, &self.thresholds);

        info!(
            "Analyzed {}/{}: {} trades used, {} rejected",
            user_id,
            strategy_id,
            trades.len(),
            rejected.len()
        );

        Ok(AnalysisOutcome {
            report,
            trades,
            rejected,
        })
    }

    /// Analyzes the journal and answers a question about it.
    pub async fn ask(
        &self,
        user_id: &str,
        strategy_id: &str,
        question: &str,
        responder: &dyn AdvisoryResponder,
        top_n: usize,
        sample: usize,
    ) -> Result<String> {
        let outcome = self.analyze(user_id, strategy_id).await?;
        let context = outcome.context(top_n, sample);
        debug!("Answering with {} responder", responder.name());
        Ok(responder.respond(question, &context).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::TemplatedResponder;
    use crate::source::MockTradeSource;
    use crate::types::RawTradeRecord;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    fn raw(id: &str, date: &str, profit: serde_json::Value) -> RawTradeRecord {
        RawTradeRecord {
            id: Some(id.to_string()),
            date: Some(date.to_string()),
            symbol: Some("btcusd".to_string()),
            side: Some("long".to_string()),
            entry_price: Some(json!(42000)),
            exit_price: None,
            quantity: Some(json!("0.5")),
            profit: Some(profit),
            strategy_id: Some("s1".to_string()),
            user_id: Some("u1".to_string()),
        }
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let guard = AnalysisGuard::new();
        let first = guard.try_begin("u1", "s1").unwrap();
        assert!(guard.is_in_flight("u1", "s1"));

        let err = guard.try_begin("u1", "s1").unwrap_err();
        assert!(matches!(err, AnalyticsError::AlreadyInFlight { .. }));

        // Other pairs are independent
        let _other = guard.try_begin("u1", "s2").unwrap();

        drop(first);
        assert!(!guard.is_in_flight("u1", "s1"));
        assert!(guard.try_begin("u1", "s1").is_ok());
    }

    #[test]
    fn test_service_skips_malformed_records() {
        let mut source = MockTradeSource::new();
        source
            .expect_fetch_trades()
            .withf(|user, strategy, limit| user.to_string() == "u1" && strategy.to_string() == "s1" && *limit == DEFAULT_FETCH_LIMIT)
            .returning(|_, _, _| {
                Ok(vec![
                    raw("1", "2024-05-01T10:00:00Z", json!(120)),
                    raw("2", "2024-05-02T10:00:00Z", json!("not a number")),
                    raw("3", "2024-05-03T10:00:00Z", json!(-40)),
                ])
            });

        let service = InsightService::new(Arc::new(source), Arc::new(AnalyticsThresholds::default()));
        let outcome = tokio_test::block_on(service.analyze("u1", "s1")).unwrap();

        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].id.as_deref(), Some("2"));
        assert_eq!(outcome.report.metrics.total_trades, 2);
        assert_eq!(outcome.trades[0].symbol, "BTCUSD");
        assert!(!service.guard().is_in_flight("u1", "s1"));
    }

    #[tokio::test]
    async fn test_source_failure_releases_guard() {
        let mut source = MockTradeSource::new();
        source
            .expect_fetch_trades()
            .returning(|_, _, _| Err(anyhow::anyhow!("journal store unavailable")));

        let service = InsightService::new(Arc::new(source), Arc::new(AnalyticsThresholds::default()));
        let err = service.analyze("u1", "s1").await.unwrap_err();
        assert!(matches!(err, AnalyticsError::Source(_)));
        assert!(!service.guard().is_in_flight("u1", "s1"));
    }

    struct BlockingSource {
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl TradeSource for BlockingSource {
        async fn fetch_trades(&self, _: &str, _: &str, _: usize) -> anyhow::Result<Vec<RawTradeRecord>> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(vec![raw("1", "2024-05-01", json!(10))])
        }
    }

    #[tokio::test]
    async fn test_duplicate_request_rejected_while_running() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let source = BlockingSource {
            started: started.clone(),
            release: release.clone(),
        };
        let service = Arc::new(InsightService::new(Arc::new(source), Arc::new(AnalyticsThresholds::default())));

        let running = service.clone();
        let handle = tokio::spawn(async move { running.analyze("u1", "s1").await });
        started.notified().await;

        let err = service.analyze("u1", "s1").await.unwrap_err();
        assert!(matches!(err, AnalyticsError::AlreadyInFlight { .. }));

        release.notify_one();
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.trades.len(), 1);
        assert!(!service.guard().is_in_flight("u1", "s1"));
    }

    #[tokio::test]
    async fn test_ask_uses_responder() {
        let mut source = MockTradeSource::new();
        source.expect_fetch_trades().returning(|_, _, _| {
            Ok((1..=6)
                .map(|d| {
                    let profit = if d % 2 == 0 { 50 } else { -20 };
                    raw(&d.to_string(), &format!("2024-05-0{}", d), json!(profit))
                })
                .collect())
        });

        let service = InsightService::new(Arc::new(source), Arc::new(AnalyticsThresholds::default())).with_fetch_limit(50);
        let answer = service
            .ask("u1", "s1", "what's my win rate?", &TemplatedResponder, 5, 5)
            .await
            .unwrap();
        assert!(answer.contains("3 of 6 trades"));
    }
}
