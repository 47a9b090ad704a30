use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analytics::{AnalysisReport, HealthScore, Insight, Metrics, PatternReport, Prediction, WinLossStreaks};
use crate::types::{chronological, TradeRecord};

pub const DEFAULT_TOP_INSIGHTS: usize = 5;
pub const DEFAULT_TRADE_SAMPLE: usize = 10;

/// Compact view of an analysis handed to the advisory chat. Holds only what
/// the chat needs to answer questions about this trader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryContext {
    pub metrics: Metrics,
    pub current_drawdown: Decimal,
    pub streaks: WinLossStreaks,
    pub health: HealthScore,
    pub patterns: PatternReport,
    pub insights: Vec<Insight>,
    pub prediction: Option<Prediction>,
    /// Newest first.
    pub recent_trades: Vec<TradeRecord>,
}

impl AdvisoryContext {
    pub fn build(report: &AnalysisReport, trades: &[TradeRecord], top_n: usize, sample: usize) -> Self {
        let mut recent_trades = chronological(trades);
        recent_trades.reverse();
        recent_trades.truncate(sample);

        Self {
            metrics: report.metrics.clone(),
            current_drawdown: report.drawdown.current_drawdown,
            streaks: report.drawdown.streaks.clone(),
            health: report.health.clone(),
            patterns: report.patterns.clone(),
            insights: report.top_insights(top_n).to_vec(),
            prediction: report.prediction.clone(),
            recent_trades,
        }
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AdvisoryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metrics;
        writeln!(f, "Trading summary")?;
        writeln!(
            f,
            "Trades: {} | Win rate: {:.1}% | Profit factor: {:.2} | Avg R:R: {:.2}",
            m.total_trades, m.win_rate, m.profit_factor, m.avg_risk_reward
        )?;
        writeln!(
            f,
            "Net profit: {:.2} | Max drawdown: {:.2} | Current drawdown: {:.2} | Consistency: {:.1}%",
            m.net_profit, m.max_drawdown, self.current_drawdown, m.consistency
        )?;

        if self.health.is_rated() {
            writeln!(
                f,
                "Health: {:.1}/100 (performance {}, risk {}, psychology {})",
                self.health.overall, self.health.performance, self.health.risk, self.health.psychology
            )?;
        } else {
            writeln!(f, "Health: not enough trades to grade")?;
        }

        let emotional = &self.patterns.emotional_risk;
        writeln!(
            f,
            "Emotional risk: {} (score {}, cooldown {} min)",
            emotional.level, emotional.score, emotional.cooldown_minutes
        )?;

        if let Some(prediction) = &self.prediction {
            writeln!(f, "Outlook: {} ({}% confidence)", prediction.outlook, prediction.confidence)?;
        }

        if !self.insights.is_empty() {
            writeln!(f)?;
            writeln!(f, "Key insights:")?;
            for (i, insight) in self.insights.iter().enumerate() {
                writeln!(
                    f,
                    "{}. [{}] {}: {} Next step: {}",
                    i + 1,
                    insight.priority,
                    insight.title,
                    insight.description,
                    insight.actionable
                )?;
            }
        }

        if !self.recent_trades.is_empty() {
            writeln!(f)?;
            writeln!(f, "Recent trades:")?;
            for trade in &self.recent_trades {
                writeln!(
                    f,
                    "- {} {} {} qty {} profit {:.2}",
                    trade.date.format("%Y-%m-%d %H:%M"),
                    trade.symbol,
                    trade.side,
                    trade.quantity.normalize(),
                    trade.profit
                )?;
            }
        }

        Ok(())
    }
}
