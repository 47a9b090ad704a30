use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::insights::{Insight, InsightCategory, InsightType, Priority};
use super::metrics::{total, Metrics};
use crate::config::AnalyticsThresholds;
use crate::types::{chronological, TradeRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outlook {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for Outlook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outlook::Positive => write!(f, "positive"),
            Outlook::Neutral => write!(f, "neutral"),
            Outlook::Negative => write!(f, "negative"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub outlook: Outlook,
    /// 0-100, 50 is neutral
    pub score: i32,
    pub confidence: u32,
    pub recent_trades: usize,
    pub recent_net_profit: Decimal,
    pub recent_win_rate: Decimal,
}

impl Prediction {
    /// Only confident predictions are worth showing next to the rule insights.
    pub fn to_insight(&self, thresholds: &AnalyticsThresholds) -> Option<Insight> {
        if self.confidence <= thresholds.prediction.surface_above {
            return None;
        }

        let (kind, priority, title, action) = match self.outlook {
            Outlook::Positive => (
                InsightType::Success,
                Priority::Medium,
                "Positive Outlook",
                "Momentum is on your side; stick to the plan rather than sizing up.",
            ),
            Outlook::Negative => (
                InsightType::Warning,
                Priority::High,
                "Negative Outlook",
                "Trade smaller until your recent results return to your baseline.",
            ),
            Outlook::Neutral => (
                InsightType::Info,
                Priority::Low,
                "Neutral Outlook",
                "Keep journaling; no clear shift in your recent results yet.",
            ),
        };

        Some(
            Insight::new("performance_outlook", kind, InsightCategory::Performance, priority, self.confidence, title)
                .with_text(
                    format!(
                        "Your last {} trades netted {} with a {}% win rate.",
                        self.recent_trades,
                        self.recent_net_profit.round_dp(2),
                        self.recent_win_rate.round_dp(1)
                    ),
                    action,
                ),
        )
    }
}

pub struct PredictionEngine;

impl PredictionEngine {
    /// Compares the most recent window against the whole history. Returns
    /// `None` when the history is too short to say anything.
    pub fn predict(trades: &[TradeRecord], metrics: &Metrics, thresholds: &AnalyticsThresholds) -> Option<Prediction> {
        let p = &thresholds.prediction;
        if trades.len() < p.min_trades {
            return None;
        }

        let sorted = chronological(trades);
        let recent = &sorted[sorted.len().saturating_sub(p.recent_window)..];
        let recent_net_profit = total(recent.iter().map(|t| t.profit));
        let recent_wins = recent.iter().filter(|t| t.is_win()).count();
        let recent_win_rate = Decimal::from(recent_wins) / Decimal::from(recent.len()) * dec!(100);

        let mut score = p.base_score;

        if recent_net_profit > Decimal::ZERO {
            score += p.recent_profit_points;
        } else if recent_net_profit < Decimal::ZERO {
            score -= p.recent_profit_points;
        }

        if recent_win_rate >= metrics.win_rate {
            score += p.win_rate_points;
        } else {
            score -= p.win_rate_points;
        }

        if metrics.consistency >= p.consistency_threshold {
            score += p.consistency_points;
        } else {
            score -= p.consistency_penalty;
        }

        // A zero profit factor with no losses is undefined, not weak
        if metrics.profit_factor >= p.strong_profit_factor {
            score += p.profit_factor_points;
        } else if metrics.gross_loss > Decimal::ZERO && metrics.profit_factor < p.weak_profit_factor {
            score -= p.profit_factor_points;
        }

        let score = score.clamp(0, 100);
        let confidence = ((score - 50).unsigned_abs() + 50).min(p.max_confidence);

        let outlook = if score > p.positive_above {
            Outlook::Positive
        } else if score < p.negative_below {
            Outlook::Negative
        } else {
            Outlook::Neutral
        };

        Some(Prediction {
            outlook,
            score,
            confidence,
            recent_trades: recent.len(),
            recent_net_profit,
            recent_win_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::metrics::MetricsCalculator;
    use chrono::{Duration, TimeZone, Utc};

    fn history(profits: &[Decimal]) -> Vec<TradeRecord> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 14, 0, 0).unwrap();
        profits
            .iter()
            .enumerate()
            .map(|(i, p)| TradeRecord::new(&format!("t{}", i), start + Duration::days(i as i64), "SPY", *p))
            .collect()
    }

    #[test]
    fn test_needs_minimum_history() {
        let trades = history(&[dec!(10); 9]);
        let thresholds = AnalyticsThresholds::default();
        let metrics = MetricsCalculator::calculate(&trades, &thresholds);
        assert!(PredictionEngine::predict(&trades, &metrics, &thresholds).is_none());
    }

    #[test]
    fn test_improving_trader_is_positive() {
        // 10 losses then 30 winners across Jan-Feb
        let mut profits = vec![dec!(-20); 10];
        profits.extend(vec![dec!(40); 30]);
        let trades = history(&profits);
        let thresholds = AnalyticsThresholds::default();
        let metrics = MetricsCalculator::calculate(&trades, &thresholds);

        let prediction = PredictionEngine::predict(&trades, &metrics, &thresholds).unwrap();
        // 50 + 15 (recent profit) + 10 (recent win rate) + 10 (consistency) + 10 (profit factor)
        assert_eq!(prediction.score, 95);
        assert_eq!(prediction.confidence, 95);
        assert_eq!(prediction.outlook, Outlook::Positive);
        assert_eq!(prediction.recent_trades, 30);

        let insight = prediction.to_insight(&thresholds).unwrap();
        assert_eq!(insight.kind, InsightType::Success);
        assert_eq!(insight.confidence, 95);
    }

    #[test]
    fn test_short_history_uses_every_trade() {
        let mut profits = vec![dec!(50); 10];
        profits.extend(vec![dec!(-30); 12]);
        let trades = history(&profits);
        let thresholds = AnalyticsThresholds::default();
        let metrics = MetricsCalculator::calculate(&trades, &thresholds);

        let prediction = PredictionEngine::predict(&trades, &metrics, &thresholds).unwrap();
        // Profit factor 500 / 360 sits between the weak and strong marks
        assert_eq!(prediction.recent_trades, 22);
        assert_eq!(prediction.recent_net_profit, dec!(140));
        assert_eq!(prediction.score, 50 + 15 + 10 + 10);
        assert_eq!(prediction.outlook, Outlook::Positive);
    }

    #[test]
    fn test_deteriorating_trader_is_negative() {
        let mut profits = vec![dec!(50); 10];
        profits.extend(vec![dec!(-30); 30]);
        let trades = history(&profits);
        let thresholds = AnalyticsThresholds::default();
        let metrics = MetricsCalculator::calculate(&trades, &thresholds);

        let prediction = PredictionEngine::predict(&trades, &metrics, &thresholds).unwrap();
        // 50 - 15 - 10 - 5 - 10
        assert_eq!(prediction.score, 10);
        assert_eq!(prediction.confidence, 90);
        assert_eq!(prediction.outlook, Outlook::Negative);

        let insight = prediction.to_insight(&thresholds).unwrap();
        assert_eq!(insight.priority, Priority::High);
    }

    #[test]
    fn test_neutral_prediction_stays_hidden() {
        let prediction = Prediction {
            outlook: Outlook::Neutral,
            score: 55,
            confidence: 55,
            recent_trades: 30,
            recent_net_profit: dec!(12),
            recent_win_rate: dec!(50),
        };
        assert!(prediction.to_insight(&AnalyticsThresholds::default()).is_none());
    }
}
