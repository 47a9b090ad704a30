use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::drawdown::{DrawdownReport, DrawdownTracker};
use super::health::{HealthScore, HealthScorer};
use super::insights::{Insight, InsightGenerator};
use super::metrics::{Metrics, MetricsCalculator};
use super::patterns::{PatternDetector, PatternReport};
use super::prediction::{Prediction, PredictionEngine};
use crate::config::AnalyticsThresholds;
use crate::types::TradeRecord;

/// Everything one analysis pass produces for a (user, strategy) trade set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub ruleset_version: u32,
    pub metrics: Metrics,
    pub drawdown: DrawdownReport,
    pub patterns: PatternReport,
    pub health: HealthScore,
    /// Ranked rule insights, followed by the outlook insight when confident.
    pub insights: Vec<Insight>,
    pub prediction: Option<Prediction>,
}

impl AnalysisReport {
    pub fn top_insights(&self, n: usize) -> &[Insight] {
        &self.insights[..n.min(self.insights.len())]
    }
}

pub struct InsightEngine;

impl InsightEngine {
    /// Runs the full pipeline: metrics and drawdown, then patterns, then
    /// health, insights and the outlook. Input order does not matter.
    pub fn analyze(trades: &[TradeRecord], thresholds: &AnalyticsThresholds) -> AnalysisReport {
        let metrics = MetricsCalculator::calculate(trades, thresholds);
        let drawdown = DrawdownTracker::calculate(trades, thresholds);
        debug!(
            "Metrics: {} trades, win rate {:.1}%, PF {:.2}, max DD {:.2}",
            metrics.total_trades, metrics.win_rate, metrics.profit_factor, drawdown.max_drawdown
        );

        let patterns = PatternDetector::detect(trades, thresholds);
        let health = HealthScorer::score(&metrics, &patterns, thresholds);
        let mut insights = InsightGenerator::generate(&metrics, &drawdown, &patterns, thresholds);

        let prediction = PredictionEngine::predict(trades, &metrics, thresholds);
        if let Some(insight) = prediction.as_ref().and_then(|p| p.to_insight(thresholds)) {
            insights.push(insight);
        }

        info!(
            "Analysis complete: {} trades, health {} ({}/{}/{}), {} insights",
            metrics.total_trades,
            health.overall,
            health.performance,
            health.risk,
            health.psychology,
            insights.len()
        );

        AnalysisReport {
            ruleset_version: thresholds.version,
            metrics,
            drawdown,
            patterns,
            health,
            insights,
            prediction,
        }
    }
}
