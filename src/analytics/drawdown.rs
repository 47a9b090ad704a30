use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::metrics::total;
use crate::config::AnalyticsThresholds;
use crate::types::{chronological, TradeRecord};

/// Point on the cumulative-profit curve, one per trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub trade_id: String,
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
    pub drawdown: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawdownReport {
    pub max_drawdown: Decimal,
    pub max_drawdown_date: Option<DateTime<Utc>>,
    pub current_drawdown: Decimal,
    pub peak_equity: Decimal,
    pub final_equity: Decimal,
    pub accelerating_recently: bool,
    pub recent_window_pnl: Decimal,
    pub recent_max_loss_streak: u32,
    pub streaks: WinLossStreaks,
    pub equity_curve: Vec<EquityPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WinLossStreaks {
    pub current_streak: i32, // Positive for wins, negative for losses
    pub max_win_streak: u32,
    pub max_loss_streak: u32,
}

pub struct DrawdownTracker;

impl DrawdownTracker {
    /// Walks the trades in entry order from a zero starting balance.
    pub fn calculate(trades: &[TradeRecord], thresholds: &AnalyticsThresholds) -> DrawdownReport {
        if trades.is_empty() {
            return DrawdownReport::default();
        }

        let sorted = chronological(trades);

        let mut equity = Decimal::ZERO;
        let mut peak = Decimal::ZERO;
        let mut max_dd = Decimal::ZERO;
        let mut max_dd_date = None;
        let mut equity_curve = Vec::with_capacity(sorted.len());

        for trade in &sorted {
            equity = equity.saturating_add(trade.profit);
            peak = peak.max(equity);

            let drawdown = peak.saturating_sub(equity);
            if drawdown > max_dd {
                max_dd = drawdown;
                max_dd_date = Some(trade.date);
            }

            equity_curve.push(EquityPoint {
                trade_id: trade.id.clone(),
                timestamp: trade.date,
                equity,
                drawdown,
            });
        }

        // Acceleration only looks at the tail of the history
        let settings = &thresholds.drawdown;
        let window = &sorted[sorted.len().saturating_sub(settings.recent_window)..];
        let recent_window_pnl = total(window.iter().map(|t| t.profit));
        let recent_max_loss_streak = Self::streaks(window).max_loss_streak;
        let accelerating_recently = recent_window_pnl < Decimal::ZERO
            && recent_window_pnl.abs() >= settings.acceleration_min_window_loss
            && recent_max_loss_streak as usize >= settings.acceleration_min_loss_streak;

        DrawdownReport {
            max_drawdown: max_dd,
            max_drawdown_date: max_dd_date,
            current_drawdown: peak.saturating_sub(equity),
            peak_equity: peak,
            final_equity: equity,
            accelerating_recently,
            recent_window_pnl,
            recent_max_loss_streak,
            streaks: Self::streaks(&sorted),
            equity_curve,
        }
    }

    /// Largest peak-to-trough decline of cumulative profit.
    pub fn max_drawdown(trades: &[TradeRecord]) -> Decimal {
        let mut equity = Decimal::ZERO;
        let mut peak = Decimal::ZERO;
        let mut max_dd = Decimal::ZERO;

        for trade in chronological(trades) {
            equity = equity.saturating_add(trade.profit);
            peak = peak.max(equity);
            max_dd = max_dd.max(peak.saturating_sub(equity));
        }

        max_dd
    }

    /// Win/loss streaks over trades already in chronological order. A
    /// breakeven trade ends whichever streak is running.
    pub fn streaks(trades: &[TradeRecord]) -> WinLossStreaks {
        let mut current_streak = 0i32;
        let mut max_win_streak = 0u32;
        let mut max_loss_streak = 0u32;

        for trade in trades {
            if trade.is_win() {
                current_streak = if current_streak >= 0 { current_streak + 1 } else { 1 };
                max_win_streak = max_win_streak.max(current_streak as u32);
            } else if trade.is_loss() {
                current_streak = if current_streak <= 0 { current_streak - 1 } else { -1 };
                max_loss_streak = max_loss_streak.max(current_streak.unsigned_abs());
            } else {
                current_streak = 0;
            }
        }

        WinLossStreaks {
            current_streak,
            max_win_streak,
            max_loss_streak,
        }
    }
}
