use chrono::Datelike;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::drawdown::DrawdownTracker;
use crate::config::AnalyticsThresholds;
use crate::types::TradeRecord;

/// Aggregate performance figures for one trade collection. Undefined ratios
/// (no losses, no trades) are reported as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub breakeven_trades: u64,
    pub win_rate: Decimal,
    pub avg_win: Decimal,
    /// Magnitude of the average losing trade.
    pub avg_loss: Decimal,
    pub avg_risk_reward: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub profit_factor: Decimal,
    pub net_profit: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub expectancy: Decimal,
    pub max_drawdown: Decimal,
    pub consistency: Decimal,
    pub trading_months: u64,
    pub profitable_months: u64,
}

impl Metrics {
    pub fn is_empty(&self) -> bool {
        self.total_trades == 0
    }
}

pub struct MetricsCalculator;

impl MetricsCalculator {
    pub fn calculate(trades: &[TradeRecord], thresholds: &AnalyticsThresholds) -> Metrics {
        if trades.is_empty() {
            return Metrics::default();
        }

        let total_trades = trades.len() as u64;
        let wins: Vec<_> = trades.iter().filter(|t| t.is_win()).collect();
        let losses: Vec<_> = trades.iter().filter(|t| t.is_loss()).collect();
        let winning_trades = wins.len() as u64;
        let losing_trades = losses.len() as u64;

        let win_rate = Decimal::from(winning_trades) / Decimal::from(total_trades) * dec!(100);

        let gross_profit = total(wins.iter().map(|t| t.profit));
        let gross_loss = total(losses.iter().map(|t| t.profit.abs()));
        let net_profit = total(trades.iter().map(|t| t.profit));

        let avg_win = if !wins.is_empty() {
            gross_profit / Decimal::from(winning_trades)
        } else {
            Decimal::ZERO
        };

        let avg_loss = if !losses.is_empty() {
            gross_loss / Decimal::from(losing_trades)
        } else {
            Decimal::ZERO
        };

        let avg_risk_reward = ratio(avg_win, avg_loss);
        let profit_factor = ratio(gross_profit, gross_loss);

        let largest_win = wins.iter().map(|t| t.profit).max().unwrap_or(Decimal::ZERO);
        let largest_loss = losses.iter().map(|t| t.profit).min().unwrap_or(Decimal::ZERO);

        let (trading_months, profitable_months) = Self::monthly_breakdown(trades, thresholds);
        let consistency = if trading_months > 0 {
            Decimal::from(profitable_months) / Decimal::from(trading_months) * dec!(100)
        } else {
            Decimal::ZERO
        };

        Metrics {
            total_trades,
            winning_trades,
            losing_trades,
            breakeven_trades: total_trades - winning_trades - losing_trades,
            win_rate,
            avg_win,
            avg_loss,
            avg_risk_reward,
            gross_profit,
            gross_loss,
            profit_factor,
            net_profit,
            largest_win,
            largest_loss,
            expectancy: net_profit / Decimal::from(total_trades),
            max_drawdown: DrawdownTracker::max_drawdown(trades),
            consistency,
            trading_months,
            profitable_months,
        }
    }

    /// Returns (months traded, months with non-negative net profit).
    fn monthly_breakdown(trades: &[TradeRecord], thresholds: &AnalyticsThresholds) -> (u64, u64) {
        let offset = thresholds.local_offset();
        let mut months: BTreeMap<(i32, u32), Decimal> = BTreeMap::new();

        for trade in trades {
            let local = trade.local_date(offset);
            let pnl = months.entry((local.year(), local.month())).or_insert(Decimal::ZERO);
            *pnl = pnl.saturating_add(trade.profit);
        }

        let profitable = months.values().filter(|pnl| **pnl >= Decimal::ZERO).count();
        (months.len() as u64, profitable as u64)
    }
}

/// Sum that clamps at the Decimal bounds instead of overflowing.
pub(crate) fn total(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Zero when there is nothing to divide by; saturates at `Decimal::MAX` when
/// the quotient is out of range.
pub(crate) fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    numerator.checked_div(denominator).unwrap_or(Decimal::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn trade(i: i64, profit: Decimal) -> TradeRecord {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        TradeRecord::new(&format!("t{}", i), start + Duration::hours(i), "EURUSD", profit)
    }

    fn scenario_a() -> Vec<TradeRecord> {
        let mut trades: Vec<_> = (0..7).map(|i| trade(i, dec!(100))).collect();
        trades.extend((7..10).map(|i| trade(i, dec!(-50))));
        trades
    }

    #[test]
    fn test_empty_collection_is_all_zero() {
        let metrics = MetricsCalculator::calculate(&[], &AnalyticsThresholds::default());
        assert_eq!(metrics, Metrics::default());
        assert!(metrics.is_empty());
    }

    #[test]
    fn test_win_rate_and_profit_factor() {
        let metrics = MetricsCalculator::calculate(&scenario_a(), &AnalyticsThresholds::default());
        assert_eq!(metrics.total_trades, 10);
        assert_eq!(metrics.win_rate, dec!(70));
        assert_eq!(metrics.profit_factor.round_dp(2), dec!(4.67));
        assert_eq!(metrics.avg_risk_reward, dec!(2));
        assert_eq!(metrics.net_profit, dec!(550));
        assert_eq!(metrics.expectancy, dec!(55));
        assert_eq!(metrics.largest_loss, dec!(-50));
    }

    #[test]
    fn test_single_breakeven_trade() {
        let metrics = MetricsCalculator::calculate(&[trade(0, Decimal::ZERO)], &AnalyticsThresholds::default());
        assert_eq!(metrics.total_trades, 1);
        assert_eq!(metrics.breakeven_trades, 1);
        assert_eq!(metrics.win_rate, Decimal::ZERO);
        assert_eq!(metrics.profit_factor, Decimal::ZERO);
    }

    #[test]
    fn test_no_losses_resolves_ratios_to_zero() {
        let trades: Vec<_> = (0..4).map(|i| trade(i, dec!(25))).collect();
        let metrics = MetricsCalculator::calculate(&trades, &AnalyticsThresholds::default());
        assert_eq!(metrics.win_rate, dec!(100));
        assert_eq!(metrics.profit_factor, Decimal::ZERO);
        assert_eq!(metrics.avg_risk_reward, Decimal::ZERO);
    }

    #[test]
    fn test_extreme_ratio_saturates() {
        let trades = vec![trade(0, dec!(10)), trade(1, dec!(-0.0000000000000000000000000001))];
        let metrics = MetricsCalculator::calculate(&trades, &AnalyticsThresholds::default());
        assert_eq!(metrics.avg_risk_reward, Decimal::MAX);
        assert_eq!(metrics.profit_factor, Decimal::MAX);
        assert_eq!(metrics.losing_trades, 1);

        let extremes = vec![trade(0, Decimal::MAX), trade(1, Decimal::MAX), trade(2, Decimal::MIN)];
        let metrics = MetricsCalculator::calculate(&extremes, &AnalyticsThresholds::default());
        assert_eq!(metrics.gross_profit, Decimal::MAX);
    }

    #[test]
    fn test_consistency_by_calendar_month() {
        let month = |m: u32, profit: Decimal| {
            TradeRecord::new("m", Utc.with_ymd_and_hms(2024, m, 10, 12, 0, 0).unwrap(), "ES", profit)
        };
        let trades = vec![
            month(1, dec!(100)),
            month(1, dec!(-40)),
            month(2, dec!(-80)),
            month(3, dec!(20)),
            month(4, dec!(0)),
        ];
        let metrics = MetricsCalculator::calculate(&trades, &AnalyticsThresholds::default());
        assert_eq!(metrics.trading_months, 4);
        assert_eq!(metrics.profitable_months, 3);
        assert_eq!(metrics.consistency, dec!(75));
    }

    #[test]
    fn test_month_boundary_respects_offset() {
        // 23:30 UTC on Jan 31 is already February at UTC+1
        let late = TradeRecord::new("late", Utc.with_ymd_and_hms(2024, 1, 31, 23, 30, 0).unwrap(), "ES", dec!(-10));
        let feb = TradeRecord::new("feb", Utc.with_ymd_and_hms(2024, 2, 5, 12, 0, 0).unwrap(), "ES", dec!(30));
        let thresholds = AnalyticsThresholds {
            utc_offset_minutes: 60,
            ..AnalyticsThresholds::default()
        };
        let metrics = MetricsCalculator::calculate(&[late, feb], &thresholds);
        assert_eq!(metrics.trading_months, 1);
        assert_eq!(metrics.consistency, dec!(100));
    }

    #[test]
    fn test_order_independent_aggregates() {
        let trades = scenario_a();
        let mut reversed = trades.clone();
        reversed.reverse();
        let thresholds = AnalyticsThresholds::default();
        let a = MetricsCalculator::calculate(&trades, &thresholds);
        let b = MetricsCalculator::calculate(&reversed, &thresholds);
        assert_eq!(a.win_rate, b.win_rate);
        assert_eq!(a.profit_factor, b.profit_factor);
        assert_eq!(a.consistency, b.consistency);
        assert_eq!(a.max_drawdown, b.max_drawdown);
    }

    #[test]
    fn test_extra_win_never_lowers_win_rate() {
        let thresholds = AnalyticsThresholds::default();
        let mut trades = scenario_a();
        let before = MetricsCalculator::calculate(&trades, &thresholds).win_rate;
        trades.push(trade(11, dec!(1)));
        let after = MetricsCalculator::calculate(&trades, &thresholds).win_rate;
        assert!(after >= before);
        assert!(after >= Decimal::ZERO && after <= dec!(100));
    }
}
