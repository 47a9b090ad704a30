use chrono::{Datelike, Duration, NaiveDate, Timelike, Weekday};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::debug;

use super::drawdown::DrawdownTracker;
use super::metrics::total;
use crate::config::{AnalyticsThresholds, RULESET_VERSION};
use crate::types::{chronological, TradeRecord};

/// Behavioral patterns found in one trade collection. Every rule has its own
/// minimum sample and reports "not detected" below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub ruleset_version: u32,
    pub revenge_trading: RevengeTrading,
    pub overtrading: Overtrading,
    pub weekend_gap: WeekendGap,
    pub symbol_edge: Option<SymbolEdge>,
    pub time_of_day: Option<TimeOfDayEdge>,
    pub emotional_risk: EmotionalRisk,
}

impl PatternReport {
    pub fn empty() -> Self {
        Self {
            ruleset_version: RULESET_VERSION,
            revenge_trading: RevengeTrading::default(),
            overtrading: Overtrading::default(),
            weekend_gap: WeekendGap::default(),
            symbol_edge: None,
            time_of_day: None,
            emotional_risk: EmotionalRisk::default(),
        }
    }

    /// Count of detected behaviors that hurt discipline.
    pub fn adverse_count(&self) -> usize {
        [
            self.revenge_trading.detected,
            self.overtrading.detected,
            self.emotional_risk.level == RiskLevel::High,
        ]
        .iter()
        .filter(|flag| **flag)
        .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevengeTrading {
    pub detected: bool,
    pub trigger_trade_id: Option<String>,
    pub prior_loss: Option<Decimal>,
    pub size_increase: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overtrading {
    pub detected: bool,
    pub trading_days: u64,
    pub avg_trades_per_day: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekendGap {
    pub detected: bool,
    pub monday_trades: u64,
    pub other_trades: u64,
    pub monday_avg_profit: Decimal,
    pub other_avg_profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolEdge {
    pub symbol: String,
    pub trades: u64,
    pub win_rate: Decimal,
    pub overall_win_rate: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeBucket {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeBucket::Morning,
            12..=16 => TimeBucket::Afternoon,
            17..=21 => TimeBucket::Evening,
            _ => TimeBucket::Night,
        }
    }

    pub fn hours(&self) -> &'static str {
        match self {
            TimeBucket::Morning => "05:00-12:00",
            TimeBucket::Afternoon => "12:00-17:00",
            TimeBucket::Evening => "17:00-22:00",
            TimeBucket::Night => "22:00-05:00",
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBucket::Morning => write!(f, "Morning"),
            TimeBucket::Afternoon => write!(f, "Afternoon"),
            TimeBucket::Evening => write!(f, "Evening"),
            TimeBucket::Night => write!(f, "Night"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeOfDayEdge {
    pub bucket: TimeBucket,
    pub trades: u64,
    pub avg_profit: Decimal,
    pub overall_avg_profit: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum EmotionalSignal {
    LossStreak { length: u32 },
    SizeEscalation { trade_id: String },
    RapidFire { gap_minutes: i64 },
}

impl EmotionalSignal {
    pub fn description(&self) -> String {
        match self {
            EmotionalSignal::LossStreak { length } => format!("{} losses in a row", length),
            EmotionalSignal::SizeEscalation { .. } => "position size increased right after a loss".to_string(),
            EmotionalSignal::RapidFire { gap_minutes } => {
                format!("trades placed {} minutes apart", gap_minutes)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionalRisk {
    pub level: RiskLevel,
    pub score: u32,
    pub signals: Vec<EmotionalSignal>,
    pub cooldown_minutes: u32,
}

pub struct PatternDetector;

impl PatternDetector {
    pub fn detect(trades: &[TradeRecord], thresholds: &AnalyticsThresholds) -> PatternReport {
        if trades.is_empty() {
            return PatternReport::empty();
        }

        let sorted = chronological(trades);
        let report = PatternReport {
            ruleset_version: thresholds.version,
            revenge_trading: Self::revenge_trading(&sorted, thresholds),
            overtrading: Self::overtrading(&sorted, thresholds),
            weekend_gap: Self::weekend_gap(&sorted, thresholds),
            symbol_edge: Self::symbol_specialization(&sorted, thresholds),
            time_of_day: Self::time_of_day_bias(&sorted, thresholds),
            emotional_risk: Self::emotional_risk(&sorted, thresholds),
        };

        debug!(
            "Patterns: revenge={}, overtrading={}, monday_edge={}, symbol={:?}, time={:?}, emotional={}",
            report.revenge_trading.detected,
            report.overtrading.detected,
            report.weekend_gap.detected,
            report.symbol_edge.as_ref().map(|e| e.symbol.as_str()),
            report.time_of_day.as_ref().map(|e| e.bucket),
            report.emotional_risk.level
        );
        report
    }

    /// Flags the first trade that follows a large loss quickly and with a
    /// clearly bigger position.
    pub fn revenge_trading(trades: &[TradeRecord], thresholds: &AnalyticsThresholds) -> RevengeTrading {
        let p = &thresholds.patterns;
        if trades.len() < p.revenge_min_trades.max(2) {
            return RevengeTrading::default();
        }

        let offset = thresholds.local_offset();
        let window = Duration::hours(p.revenge_window_hours);
        let sorted = chronological(trades);

        for pair in sorted.windows(2) {
            let (prev, cur) = (&pair[0], &pair[1]);
            if prev.profit >= -p.revenge_loss_threshold {
                continue;
            }

            let same_day = prev.local_date(offset).date_naive() == cur.local_date(offset).date_naive();
            let quick = cur.date - prev.date <= window;
            // Sizes are only comparable against a real position
            let oversized = prev.quantity > Decimal::ZERO
                && cur.quantity > prev.quantity.saturating_mul(p.revenge_size_multiplier);

            if (same_day || quick) && oversized {
                return RevengeTrading {
                    detected: true,
                    trigger_trade_id: Some(cur.id.clone()),
                    prior_loss: Some(prev.profit),
                    size_increase: cur.quantity.checked_div(prev.quantity),
                };
            }
        }

        RevengeTrading::default()
    }

    pub fn overtrading(trades: &[TradeRecord], thresholds: &AnalyticsThresholds) -> Overtrading {
        let p = &thresholds.patterns;
        let offset = thresholds.local_offset();
        let days: HashSet<NaiveDate> = trades.iter().map(|t| t.local_date(offset).date_naive()).collect();

        if days.is_empty() {
            return Overtrading::default();
        }

        let avg_trades_per_day = Decimal::from(trades.len()) / Decimal::from(days.len());
        Overtrading {
            detected: trades.len() >= p.overtrading_min_trades && avg_trades_per_day > p.overtrading_max_trades_per_day,
            trading_days: days.len() as u64,
            avg_trades_per_day,
        }
    }

    /// Compares Monday results (gap risk after the weekend) against the rest
    /// of the week.
    pub fn weekend_gap(trades: &[TradeRecord], thresholds: &AnalyticsThresholds) -> WeekendGap {
        let p = &thresholds.patterns;
        let offset = thresholds.local_offset();
        let (monday, other): (Vec<_>, Vec<_>) = trades
            .iter()
            .partition(|t| t.local_date(offset).weekday() == Weekday::Mon);

        let monday_avg_profit = average_profit(&monday);
        let other_avg_profit = average_profit(&other);
        let sufficient = monday.len() >= p.weekend_min_trades && other.len() >= p.weekend_min_trades;

        WeekendGap {
            detected: sufficient
                && monday_avg_profit > Decimal::ZERO
                && monday_avg_profit > other_avg_profit.saturating_mul(p.weekend_edge_multiplier),
            monday_trades: monday.len() as u64,
            other_trades: other.len() as u64,
            monday_avg_profit,
            other_avg_profit,
        }
    }

    /// Best symbol whose win rate beats the overall win rate by the margin.
    /// Ties go to the symbol with more trades, then to the lexically first.
    pub fn symbol_specialization(trades: &[TradeRecord], thresholds: &AnalyticsThresholds) -> Option<SymbolEdge> {
        let p = &thresholds.patterns;
        if trades.is_empty() {
            return None;
        }

        let overall_win_rate = win_rate(trades.iter().filter(|t| t.is_win()).count(), trades.len());

        let mut by_symbol: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for trade in trades {
            let entry = by_symbol.entry(trade.symbol.as_str()).or_insert((0, 0));
            entry.0 += 1;
            if trade.is_win() {
                entry.1 += 1;
            }
        }

        let mut best: Option<SymbolEdge> = None;
        for (symbol, (count, wins)) in by_symbol {
            if count < p.symbol_min_trades {
                continue;
            }
            let symbol_win_rate = win_rate(wins, count);
            if symbol_win_rate <= overall_win_rate + p.symbol_win_rate_margin {
                continue;
            }

            let better = match &best {
                None => true,
                Some(current) => {
                    (symbol_win_rate, count as u64) > (current.win_rate, current.trades)
                }
            };
            if better {
                best = Some(SymbolEdge {
                    symbol: symbol.to_string(),
                    trades: count as u64,
                    win_rate: symbol_win_rate,
                    overall_win_rate,
                });
            }
        }

        best
    }

    /// Session whose average profit is positive and beats the overall average
    /// by the relative margin.
    pub fn time_of_day_bias(trades: &[TradeRecord], thresholds: &AnalyticsThresholds) -> Option<TimeOfDayEdge> {
        let p = &thresholds.patterns;
        if trades.is_empty() {
            return None;
        }

        let offset = thresholds.local_offset();
        let all: Vec<&TradeRecord> = trades.iter().collect();
        let overall_avg_profit = average_profit(&all);
        let required_edge = overall_avg_profit.abs().saturating_mul(p.time_bias_relative_margin);

        let mut buckets: BTreeMap<TimeBucket, Vec<&TradeRecord>> = BTreeMap::new();
        for trade in trades {
            let bucket = TimeBucket::from_hour(trade.local_date(offset).hour());
            buckets.entry(bucket).or_default().push(trade);
        }

        buckets
            .into_iter()
            .filter(|(_, bucket_trades)| bucket_trades.len() >= p.time_bucket_min_trades)
            .map(|(bucket, bucket_trades)| TimeOfDayEdge {
                bucket,
                trades: bucket_trades.len() as u64,
                avg_profit: average_profit(&bucket_trades),
                overall_avg_profit,
            })
            .filter(|edge| {
                edge.avg_profit > Decimal::ZERO && edge.avg_profit - overall_avg_profit > required_edge
            })
            .fold(None, |best: Option<TimeOfDayEdge>, edge| match best {
                Some(current) if current.avg_profit >= edge.avg_profit => Some(current),
                _ => Some(edge),
            })
    }

    /// Scores the most recent trades for tilt. Each signal adds its fixed
    /// points once; the cooldown scales with the total.
    pub fn emotional_risk(trades: &[TradeRecord], thresholds: &AnalyticsThresholds) -> EmotionalRisk {
        let e = &thresholds.patterns.emotional;
        if trades.len() < e.min_trades {
            return EmotionalRisk::default();
        }

        let sorted = chronological(trades);
        let recent = &sorted[sorted.len().saturating_sub(e.window)..];

        let mut score = 0u32;
        let mut signals = Vec::new();

        let loss_streak = DrawdownTracker::streaks(recent).max_loss_streak;
        if loss_streak as usize >= e.loss_streak {
            score += e.loss_streak_points;
            signals.push(EmotionalSignal::LossStreak { length: loss_streak });
        }

        let escalation = recent
            .windows(2)
            .find(|w| {
                w[0].is_loss()
                    && w[0].quantity > Decimal::ZERO
                    && w[1].quantity > w[0].quantity.saturating_mul(e.escalation_multiplier)
            });
        if let Some(w) = escalation {
            score += e.size_escalation_points;
            signals.push(EmotionalSignal::SizeEscalation { trade_id: w[1].id.clone() });
        }

        let rapid_limit = Duration::minutes(e.rapid_fire_minutes);
        let shortest_gap = recent
            .windows(2)
            .map(|w| w[1].date - w[0].date)
            .filter(|gap| *gap <= rapid_limit)
            .min();
        if let Some(gap) = shortest_gap {
            score += e.rapid_fire_points;
            signals.push(EmotionalSignal::RapidFire { gap_minutes: gap.num_minutes() });
        }

        let level = if score > e.high_risk_score {
            RiskLevel::High
        } else if score > e.medium_risk_score {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        EmotionalRisk {
            level,
            score,
            signals,
            cooldown_minutes: score * e.cooldown_minutes_per_point,
        }
    }
}

fn average_profit(trades: &[&TradeRecord]) -> Decimal {
    if trades.is_empty() {
        return Decimal::ZERO;
    }
    total(trades.iter().map(|t| t.profit)) / Decimal::from(trades.len())
}

fn win_rate(wins: usize, total: usize) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(wins) / Decimal::from(total) * dec!(100)
}
