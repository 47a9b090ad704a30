use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::metrics::Metrics;
use super::patterns::{PatternReport, RiskLevel};
use crate::config::{AnalyticsThresholds, GradeBand};
use crate::types::Grade;

/// Points earned by each capped component of the overall score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub win_rate: Decimal,
    pub risk_reward: Decimal,
    pub profit_factor: Decimal,
    pub consistency: Decimal,
}

impl SubScores {
    pub fn total(&self) -> Decimal {
        self.win_rate + self.risk_reward + self.profit_factor + self.consistency
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub performance: Grade,
    pub risk: Grade,
    pub psychology: Grade,
    /// 0-100
    pub overall: Decimal,
    pub discipline: u32,
    pub sub_scores: SubScores,
}

impl HealthScore {
    /// Returned when there are too few trades to grade.
    pub fn insufficient_data() -> Self {
        Self {
            performance: Grade::NotRated,
            risk: Grade::NotRated,
            psychology: Grade::NotRated,
            overall: Decimal::ZERO,
            discipline: 0,
            sub_scores: SubScores::default(),
        }
    }

    pub fn is_rated(&self) -> bool {
        self.performance.is_rated()
    }
}

pub struct HealthScorer;

impl HealthScorer {
    pub fn score(metrics: &Metrics, patterns: &PatternReport, thresholds: &AnalyticsThresholds) -> HealthScore {
        let grading = &thresholds.grading;
        if (metrics.total_trades as usize) < grading.min_trades_for_grade {
            return HealthScore::insufficient_data();
        }

        let discipline = Self::discipline(patterns, thresholds);
        let sub_scores = Self::sub_scores(metrics, thresholds);

        let total_points = Decimal::from(grading.weights.total_points());
        let overall = if total_points > Decimal::ZERO {
            (sub_scores.total() / total_points * dec!(100)).round_dp(1)
        } else {
            Decimal::ZERO
        };

        HealthScore {
            performance: Self::grade(&grading.performance_bands, metrics.win_rate, metrics.profit_factor),
            risk: Self::grade(&grading.risk_bands, metrics.avg_risk_reward, metrics.consistency),
            psychology: Self::grade(&grading.psychology_bands, Decimal::from(discipline), Decimal::ZERO),
            overall,
            discipline,
            sub_scores,
        }
    }

    /// 100 minus the penalty of every adverse behavior found.
    pub fn discipline(patterns: &PatternReport, thresholds: &AnalyticsThresholds) -> u32 {
        let penalties = &thresholds.grading.penalties;
        let mut penalty = 0u32;

        if patterns.revenge_trading.detected {
            penalty += penalties.revenge_trading;
        }
        if patterns.overtrading.detected {
            penalty += penalties.overtrading;
        }
        penalty += match patterns.emotional_risk.level {
            RiskLevel::High => penalties.emotional_high,
            RiskLevel::Medium => penalties.emotional_medium,
            RiskLevel::Low => 0,
        };

        100u32.saturating_sub(penalty)
    }

    /// First band whose minimums are both met; bands are ordered best-first.
    fn grade(bands: &[GradeBand], primary: Decimal, secondary: Decimal) -> Grade {
        bands
            .iter()
            .find(|band| primary >= band.min_primary && secondary >= band.min_secondary)
            .or_else(|| bands.last())
            .map(|band| band.grade)
            .unwrap_or(Grade::C)
    }

    fn sub_scores(metrics: &Metrics, thresholds: &AnalyticsThresholds) -> SubScores {
        let w = &thresholds.grading.weights;
        SubScores {
            win_rate: capped(metrics.win_rate, w.win_rate_target, w.win_rate_points),
            risk_reward: capped(metrics.avg_risk_reward, w.risk_reward_target, w.risk_reward_points),
            profit_factor: capped(metrics.profit_factor, w.profit_factor_target, w.profit_factor_points),
            consistency: capped(metrics.consistency, dec!(100), w.consistency_points),
        }
    }
}

fn capped(value: Decimal, target: Decimal, points: u32) -> Decimal {
    if target <= Decimal::ZERO || value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let progress = value.checked_div(target).map_or(Decimal::ONE, |r| r.min(Decimal::ONE));
    progress * Decimal::from(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::patterns::EmotionalRisk;

    fn metrics(total: u64, win_rate: Decimal, rr: Decimal, pf: Decimal, consistency: Decimal) -> Metrics {
        Metrics {
            total_trades: total,
            win_rate,
            avg_risk_reward: rr,
            profit_factor: pf,
            consistency,
            ..Metrics::default()
        }
    }

    #[test]
    fn test_strong_profile_scores_full_marks() {
        let m = metrics(10, dec!(70), dec!(2), dec!(4.67), dec!(100));
        let health = HealthScorer::score(&m, &PatternReport::empty(), &AnalyticsThresholds::default());
        assert_eq!(health.performance, Grade::APlus);
        assert_eq!(health.risk, Grade::A);
        assert_eq!(health.psychology, Grade::APlus);
        assert_eq!(health.discipline, 100);
        assert_eq!(health.overall, dec!(100));
    }

    #[test]
    fn test_partial_sub_scores() {
        // 30 * 0.5 + 25 * 0.5 + 25 * 0.5 + 20 * 0.5
        let m = metrics(8, dec!(30), dec!(1), dec!(1), dec!(50));
        let health = HealthScorer::score(&m, &PatternReport::empty(), &AnalyticsThresholds::default());
        assert_eq!(health.sub_scores.total(), dec!(50));
        assert_eq!(health.overall, dec!(50));
        assert_eq!(health.performance, Grade::C);
        assert_eq!(health.risk, Grade::B);
    }

    #[test]
    fn test_insufficient_data_sentinel() {
        let m = metrics(4, dec!(100), dec!(3), dec!(3), dec!(100));
        let health = HealthScorer::score(&m, &PatternReport::empty(), &AnalyticsThresholds::default());
        assert_eq!(health, HealthScore::insufficient_data());
        assert!(!health.is_rated());
        assert_eq!(health.performance.to_string(), "N/A");
    }

    #[test]
    fn test_behavior_lowers_psychology_grade() {
        let mut patterns = PatternReport::empty();
        patterns.revenge_trading.detected = true;
        patterns.emotional_risk = EmotionalRisk {
            level: RiskLevel::Medium,
            score: 40,
            signals: Vec::new(),
            cooldown_minutes: 80,
        };
        let m = metrics(20, dec!(55), dec!(1.5), dec!(1.8), dec!(60));
        let health = HealthScorer::score(&m, &patterns, &AnalyticsThresholds::default());
        assert_eq!(health.discipline, 50);
        assert_eq!(health.psychology, Grade::C);
        assert_eq!(health.performance, Grade::BPlus);
    }

    #[test]
    fn test_discipline_never_negative() {
        let mut patterns = PatternReport::empty();
        patterns.revenge_trading.detected = true;
        patterns.overtrading.detected = true;
        patterns.emotional_risk.level = RiskLevel::High;
        let mut thresholds = AnalyticsThresholds::default();
        thresholds.grading.penalties.overtrading = 60;
        assert_eq!(HealthScorer::discipline(&patterns, &thresholds), 0);
    }
}
