use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::drawdown::DrawdownReport;
use super::metrics::Metrics;
use super::patterns::{PatternReport, RiskLevel};
use crate::config::AnalyticsThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightType {
    Success,
    Warning,
    Info,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightCategory {
    Performance,
    Risk,
    Psychology,
    Strategy,
    Timing,
}

/// Declared most urgent first so the derived ordering sorts high before low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightType::Success => write!(f, "success"),
            InsightType::Warning => write!(f, "warning"),
            InsightType::Info => write!(f, "info"),
            InsightType::Danger => write!(f, "danger"),
        }
    }
}

impl fmt::Display for InsightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightCategory::Performance => write!(f, "performance"),
            InsightCategory::Risk => write!(f, "risk"),
            InsightCategory::Psychology => write!(f, "psychology"),
            InsightCategory::Strategy => write!(f, "strategy"),
            InsightCategory::Timing => write!(f, "timing"),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// One observation about the trader, recomputed on every analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Stable identifier of the rule that produced this insight.
    pub rule: String,
    #[serde(rename = "type")]
    pub kind: InsightType,
    pub category: InsightCategory,
    pub title: String,
    pub description: String,
    /// Recommended next step.
    pub actionable: String,
    pub confidence: u32,
    pub priority: Priority,
}

impl Insight {
    pub fn new(
        rule: &str,
        kind: InsightType,
        category: InsightCategory,
        priority: Priority,
        confidence: u32,
        title: &str,
    ) -> Self {
        Self {
            rule: rule.to_string(),
            kind,
            category,
            title: title.to_string(),
            description: String::new(),
            actionable: String::new(),
            confidence: confidence.min(100),
            priority,
        }
    }

    pub fn with_text(mut self, description: String, actionable: &str) -> Self {
        self.description = description;
        self.actionable = actionable.to_string();
        self
    }
}

pub struct InsightGenerator;

impl InsightGenerator {
    /// Evaluates every rule in declaration order and ranks the results by
    /// priority. Rules with equal priority keep their declaration order.
    pub fn generate(
        metrics: &Metrics,
        drawdown: &DrawdownReport,
        patterns: &PatternReport,
        thresholds: &AnalyticsThresholds,
    ) -> Vec<Insight> {
        let mut insights = Vec::new();
        let s = &thresholds.insights;
        let enough_trades = metrics.total_trades as usize >= s.min_trades_for_insights;

        if enough_trades {
            Self::performance_rules(metrics, thresholds, &mut insights);
        }

        if enough_trades && metrics.max_drawdown >= s.large_drawdown {
            insights.push(
                Insight::new("drawdown_large", InsightType::Danger, InsightCategory::Risk, Priority::High, 90, "Large Drawdown")
                    .with_text(
                        format!(
                            "Your equity fell {} from its peak at the worst point.",
                            metrics.max_drawdown.round_dp(2)
                        ),
                        "Cut position size until the account recovers and set a daily loss limit.",
                    ),
            );
        }

        if drawdown.accelerating_recently {
            insights.push(
                Insight::new(
                    "drawdown_accelerating",
                    InsightType::Danger,
                    InsightCategory::Risk,
                    Priority::High,
                    85,
                    "Drawdown Accelerating",
                )
                .with_text(
                    format!(
                        "Your recent trades lost {} with a run of {} consecutive losses.",
                        drawdown.recent_window_pnl.abs().round_dp(2),
                        drawdown.recent_max_loss_streak
                    ),
                    "Pause and review the recent losing trades before taking the next setup.",
                ),
            );
        }

        Self::behavior_rules(patterns, &mut insights);

        if enough_trades && metrics.trading_months as usize >= s.consistency_min_months {
            if metrics.consistency >= s.strong_consistency {
                insights.push(
                    Insight::new(
                        "consistency_strong",
                        InsightType::Success,
                        InsightCategory::Performance,
                        Priority::Low,
                        75,
                        "Consistent Months",
                    )
                    .with_text(
                        format!(
                            "{} of your {} trading months finished at or above breakeven.",
                            metrics.profitable_months, metrics.trading_months
                        ),
                        "Keep your routine; consistency compounds.",
                    ),
                );
            } else if metrics.consistency < s.weak_consistency {
                insights.push(
                    Insight::new(
                        "consistency_weak",
                        InsightType::Warning,
                        InsightCategory::Performance,
                        Priority::Medium,
                        70,
                        "Inconsistent Months",
                    )
                    .with_text(
                        format!(
                            "Only {} of your {} trading months were profitable.",
                            metrics.profitable_months, metrics.trading_months
                        ),
                        "Compare your best and worst months to find what changed.",
                    ),
                );
            }
        }

        insights.sort_by_key(|insight| insight.priority);
        debug!("Generated {} insights", insights.len());
        insights
    }

    fn performance_rules(metrics: &Metrics, thresholds: &AnalyticsThresholds, insights: &mut Vec<Insight>) {
        let s = &thresholds.insights;

        if metrics.win_rate >= s.strong_win_rate {
            insights.push(
                Insight::new("win_rate_strong", InsightType::Success, InsightCategory::Performance, Priority::Medium, 85, "Strong Win Rate")
                    .with_text(
                        format!("You win {}% of your trades.", metrics.win_rate.round_dp(1)),
                        "Keep following the setups that produce these wins.",
                    ),
            );
        } else if metrics.win_rate < s.weak_win_rate {
            insights.push(
                Insight::new("win_rate_weak", InsightType::Warning, InsightCategory::Performance, Priority::High, 80, "Low Win Rate")
                    .with_text(
                        format!("Only {}% of your trades are winners.", metrics.win_rate.round_dp(1)),
                        "Tighten your entry criteria and skip marginal setups.",
                    ),
            );
        }

        if metrics.avg_risk_reward >= s.strong_risk_reward {
            insights.push(
                Insight::new("risk_reward_strong", InsightType::Success, InsightCategory::Risk, Priority::Medium, 80, "Healthy Risk:Reward")
                    .with_text(
                        format!(
                            "Your average winner is {}x your average loser.",
                            metrics.avg_risk_reward.round_dp(2)
                        ),
                        "Keep letting winners run to target.",
                    ),
            );
        } else if metrics.avg_risk_reward > Decimal::ZERO && metrics.avg_risk_reward < s.weak_risk_reward {
            insights.push(
                Insight::new("risk_reward_weak", InsightType::Warning, InsightCategory::Risk, Priority::High, 85, "Poor Risk:Reward")
                    .with_text(
                        format!(
                            "Your average winner is only {}x your average loser.",
                            metrics.avg_risk_reward.round_dp(2)
                        ),
                        "Move stops closer or hold winners longer.",
                    ),
            );
        }

        if metrics.profit_factor > Decimal::ZERO && metrics.profit_factor < s.weak_profit_factor {
            insights.push(
                Insight::new(
                    "profit_factor_negative",
                    InsightType::Danger,
                    InsightCategory::Performance,
                    Priority::High,
                    90,
                    "Losing Edge",
                )
                .with_text(
                    format!(
                        "Profit factor is {}: losses outweigh gains.",
                        metrics.profit_factor.round_dp(2)
                    ),
                    "Reduce size and review which setups lose the most.",
                ),
            );
        }
    }

    fn behavior_rules(patterns: &PatternReport, insights: &mut Vec<Insight>) {
        let revenge = &patterns.revenge_trading;
        if revenge.detected {
            let loss = revenge.prior_loss.map(|l| l.abs().round_dp(2)).unwrap_or_default();
            insights.push(
                Insight::new("revenge_trading", InsightType::Danger, InsightCategory::Psychology, Priority::High, 80, "Revenge Trading")
                    .with_text(
                        format!(
                            "After a {} loss you re-entered quickly with a larger position (trade {}).",
                            loss,
                            revenge.trigger_trade_id.as_deref().unwrap_or("unknown")
                        ),
                        "After a big loss, step away before placing the next trade.",
                    ),
            );
        }

        if patterns.overtrading.detected {
            insights.push(
                Insight::new("overtrading", InsightType::Warning, InsightCategory::Psychology, Priority::Medium, 75, "Overtrading")
                    .with_text(
                        format!(
                            "You average {} trades per trading day.",
                            patterns.overtrading.avg_trades_per_day.round_dp(1)
                        ),
                        "Set a daily trade cap and only take A-grade setups.",
                    ),
            );
        }

        let emotional = &patterns.emotional_risk;
        if emotional.level == RiskLevel::High {
            let signals: Vec<String> = emotional.signals.iter().map(|s| s.description()).collect();
            insights.push(
                Insight::new("emotional_risk", InsightType::Warning, InsightCategory::Psychology, Priority::High, 70, "High Emotional Risk")
                    .with_text(
                        format!("Recent trading shows {}.", signals.join(", ")),
                        &format!("Take a {} minute break before your next trade.", emotional.cooldown_minutes),
                    ),
            );
        }

        if let Some(edge) = &patterns.symbol_edge {
            insights.push(
                Insight::new(
                    "symbol_specialization",
                    InsightType::Success,
                    InsightCategory::Strategy,
                    Priority::Medium,
                    75,
                    "Symbol Specialization",
                )
                .with_text(
                    format!(
                        "You win {}% on {} across {} trades, versus {}% overall.",
                        edge.win_rate.round_dp(1),
                        edge.symbol,
                        edge.trades,
                        edge.overall_win_rate.round_dp(1)
                    ),
                    &format!("Consider focusing more of your capital on {}.", edge.symbol),
                ),
            );
        }

        let weekend = &patterns.weekend_gap;
        if weekend.detected {
            insights.push(
                Insight::new("weekend_gap_edge", InsightType::Info, InsightCategory::Timing, Priority::Low, 65, "Monday Edge")
                    .with_text(
                        format!(
                            "Monday trades average {} versus {} on other days.",
                            weekend.monday_avg_profit.round_dp(2),
                            weekend.other_avg_profit.round_dp(2)
                        ),
                        "Prepare weekend gap plans ahead of the Monday open.",
                    ),
            );
        }

        if let Some(edge) = &patterns.time_of_day {
            insights.push(
                Insight::new("time_of_day_bias", InsightType::Info, InsightCategory::Timing, Priority::Low, 70, "Best Trading Session")
                    .with_text(
                        format!(
                            "{} trades ({}) average {} versus {} overall.",
                            edge.bucket,
                            edge.bucket.hours(),
                            edge.avg_profit.round_dp(2),
                            edge.overall_avg_profit.round_dp(2)
                        ),
                        &format!("Schedule more of your trading in the {} session.", edge.bucket.to_string().to_lowercase()),
                    ),
            );
        }
    }
}
