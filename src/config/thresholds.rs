use chrono::{FixedOffset, Offset, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Grade;

/// Version of the rule definitions these defaults are calibrated for. Bump it
/// whenever a default threshold or rule condition changes.
pub const RULESET_VERSION: u32 = 2;

/// Every tunable constant used by the analytics pipeline. Built once, shared
/// read-only, and passed into each calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsThresholds {
    pub version: u32,
    /// Offset applied before deriving calendar days, months, weekdays and hours.
    pub utc_offset_minutes: i32,
    pub drawdown: DrawdownSettings,
    pub patterns: PatternSettings,
    pub grading: GradingSettings,
    pub insights: InsightSettings,
    pub prediction: PredictionSettings,
}

impl Default for AnalyticsThresholds {
    fn default() -> Self {
        Self {
            version: RULESET_VERSION,
            utc_offset_minutes: 0,
            drawdown: DrawdownSettings::default(),
            patterns: PatternSettings::default(),
            grading: GradingSettings::default(),
            insights: InsightSettings::default(),
            prediction: PredictionSettings::default(),
        }
    }
}

impl AnalyticsThresholds {
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.utc_offset_minutes.abs() > 14 * 60 {
            errors.push("utc_offset_minutes must be within +/-840".to_string());
        }

        // Drawdown validation
        if self.drawdown.recent_window == 0 {
            errors.push("drawdown.recent_window must be > 0".to_string());
        }
        if self.drawdown.acceleration_min_window_loss < Decimal::ZERO {
            errors.push("drawdown.acceleration_min_window_loss must be >= 0".to_string());
        }

        // Pattern validation
        let p = &self.patterns;
        if p.revenge_min_trades < 2 {
            errors.push("patterns.revenge_min_trades must be >= 2".to_string());
        }
        if p.revenge_size_multiplier < Decimal::ONE {
            errors.push("patterns.revenge_size_multiplier must be >= 1".to_string());
        }
        if p.overtrading_max_trades_per_day <= Decimal::ZERO {
            errors.push("patterns.overtrading_max_trades_per_day must be > 0".to_string());
        }
        if p.weekend_edge_multiplier < Decimal::ONE {
            errors.push("patterns.weekend_edge_multiplier must be >= 1".to_string());
        }
        if p.symbol_win_rate_margin < Decimal::ZERO || p.symbol_win_rate_margin > dec!(100) {
            errors.push("patterns.symbol_win_rate_margin must be between 0 and 100".to_string());
        }
        if p.time_bias_relative_margin < Decimal::ZERO {
            errors.push("patterns.time_bias_relative_margin must be >= 0".to_string());
        }
        let e = &p.emotional;
        if e.window == 0 {
            errors.push("patterns.emotional.window must be > 0".to_string());
        }
        if e.medium_risk_score > e.high_risk_score {
            errors.push("patterns.emotional.medium_risk_score must be <= high_risk_score".to_string());
        }

        // Grading validation
        let g = &self.grading;
        for (name, bands) in [
            ("performance_bands", &g.performance_bands),
            ("risk_bands", &g.risk_bands),
            ("psychology_bands", &g.psychology_bands),
        ] {
            if bands.is_empty() {
                errors.push(format!("grading.{} must not be empty", name));
            }
            if bands.windows(2).any(|w| w[0].grade <= w[1].grade) {
                errors.push(format!("grading.{} must be ordered from best to worst grade", name));
            }
        }
        if g.weights.total_points() == 0 {
            errors.push("grading.weights must allocate at least one point".to_string());
        }
        if g.weights.win_rate_target <= Decimal::ZERO
            || g.weights.risk_reward_target <= Decimal::ZERO
            || g.weights.profit_factor_target <= Decimal::ZERO
        {
            errors.push("grading.weights targets must be > 0".to_string());
        }

        // Insight validation
        if self.insights.weak_win_rate > self.insights.strong_win_rate {
            errors.push("insights.weak_win_rate must be <= strong_win_rate".to_string());
        }
        if self.insights.weak_consistency > self.insights.strong_consistency {
            errors.push("insights.weak_consistency must be <= strong_consistency".to_string());
        }

        // Prediction validation
        let pr = &self.prediction;
        if pr.recent_window == 0 {
            errors.push("prediction.recent_window must be > 0".to_string());
        }
        if pr.negative_below > pr.positive_above {
            errors.push("prediction.negative_below must be <= positive_above".to_string());
        }
        if pr.max_confidence > 100 {
            errors.push("prediction.max_confidence must be <= 100".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownSettings {
    pub recent_window: usize,
    pub acceleration_min_window_loss: Decimal,
    pub acceleration_min_loss_streak: usize,
}

impl Default for DrawdownSettings {
    fn default() -> Self {
        Self {
            recent_window: 20,
            acceleration_min_window_loss: dec!(100),
            acceleration_min_loss_streak: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSettings {
    // Revenge trading
    pub revenge_min_trades: usize,
    pub revenge_loss_threshold: Decimal,
    pub revenge_window_hours: i64,
    pub revenge_size_multiplier: Decimal,

    // Overtrading
    pub overtrading_min_trades: usize,
    pub overtrading_max_trades_per_day: Decimal,

    // Monday vs rest of week
    pub weekend_min_trades: usize,
    pub weekend_edge_multiplier: Decimal,

    // Symbol specialization (percentage points over overall win rate)
    pub symbol_min_trades: usize,
    pub symbol_win_rate_margin: Decimal,

    // Time-of-day bias
    pub time_bucket_min_trades: usize,
    pub time_bias_relative_margin: Decimal,

    pub emotional: EmotionalRiskSettings,
}

impl Default for PatternSettings {
    fn default() -> Self {
        Self {
            revenge_min_trades: 2,
            revenge_loss_threshold: dec!(100),
            revenge_window_hours: 2,
            revenge_size_multiplier: dec!(1.5),
            overtrading_min_trades: 10,
            overtrading_max_trades_per_day: dec!(10),
            weekend_min_trades: 3,
            weekend_edge_multiplier: dec!(1.5),
            symbol_min_trades: 5,
            symbol_win_rate_margin: dec!(15),
            time_bucket_min_trades: 5,
            time_bias_relative_margin: dec!(0.25),
            emotional: EmotionalRiskSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalRiskSettings {
    pub window: usize,
    pub min_trades: usize,
    pub loss_streak: usize,
    pub loss_streak_points: u32,
    pub escalation_multiplier: Decimal,
    pub size_escalation_points: u32,
    pub rapid_fire_minutes: i64,
    pub rapid_fire_points: u32,
    pub high_risk_score: u32,
    pub medium_risk_score: u32,
    pub cooldown_minutes_per_point: u32,
}

impl Default for EmotionalRiskSettings {
    fn default() -> Self {
        Self {
            window: 10,
            min_trades: 3,
            loss_streak: 3,
            loss_streak_points: 40,
            escalation_multiplier: dec!(1.2),
            size_escalation_points: 30,
            rapid_fire_minutes: 30,
            rapid_fire_points: 20,
            high_risk_score: 60,
            medium_risk_score: 30,
            cooldown_minutes_per_point: 2,
        }
    }
}

/// One rung of a grading ladder. A value earns `grade` when both inputs meet
/// the minimums; rungs are checked best-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    pub grade: Grade,
    pub min_primary: Decimal,
    pub min_secondary: Decimal,
}

impl GradeBand {
    pub fn new(grade: Grade, min_primary: Decimal, min_secondary: Decimal) -> Self {
        Self { grade, min_primary, min_secondary }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub win_rate_points: u32,
    pub risk_reward_points: u32,
    pub profit_factor_points: u32,
    pub consistency_points: u32,
    /// Values at or above these targets earn the full allocation.
    pub win_rate_target: Decimal,
    pub risk_reward_target: Decimal,
    pub profit_factor_target: Decimal,
}

impl ScoreWeights {
    pub fn total_points(&self) -> u32 {
        self.win_rate_points + self.risk_reward_points + self.profit_factor_points + self.consistency_points
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            win_rate_points: 30,
            risk_reward_points: 25,
            profit_factor_points: 25,
            consistency_points: 20,
            win_rate_target: dec!(60),
            risk_reward_target: dec!(2),
            profit_factor_target: dec!(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorPenalties {
    pub revenge_trading: u32,
    pub overtrading: u32,
    pub emotional_high: u32,
    pub emotional_medium: u32,
}

impl Default for BehaviorPenalties {
    fn default() -> Self {
        Self {
            revenge_trading: 40,
            overtrading: 25,
            emotional_high: 25,
            emotional_medium: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingSettings {
    pub min_trades_for_grade: usize,
    /// Primary: win rate %, secondary: profit factor.
    pub performance_bands: Vec<GradeBand>,
    /// Primary: average risk:reward, secondary: consistency %.
    pub risk_bands: Vec<GradeBand>,
    /// Primary: discipline score (100 minus behavior penalties).
    pub psychology_bands: Vec<GradeBand>,
    pub weights: ScoreWeights,
    pub penalties: BehaviorPenalties,
}

impl Default for GradingSettings {
    fn default() -> Self {
        Self {
            min_trades_for_grade: 5,
            performance_bands: vec![
                GradeBand::new(Grade::APlus, dec!(65), dec!(2.5)),
                GradeBand::new(Grade::A, dec!(55), dec!(2.0)),
                GradeBand::new(Grade::BPlus, dec!(50), dec!(1.5)),
                GradeBand::new(Grade::B, dec!(45), dec!(1.0)),
                GradeBand::new(Grade::C, Decimal::ZERO, Decimal::ZERO),
            ],
            risk_bands: vec![
                GradeBand::new(Grade::APlus, dec!(3.0), dec!(75)),
                GradeBand::new(Grade::A, dec!(2.0), dec!(60)),
                GradeBand::new(Grade::BPlus, dec!(1.5), dec!(50)),
                GradeBand::new(Grade::B, dec!(1.0), Decimal::ZERO),
                GradeBand::new(Grade::C, Decimal::ZERO, Decimal::ZERO),
            ],
            psychology_bands: vec![
                GradeBand::new(Grade::APlus, dec!(90), Decimal::ZERO),
                GradeBand::new(Grade::A, dec!(80), Decimal::ZERO),
                GradeBand::new(Grade::BPlus, dec!(70), Decimal::ZERO),
                GradeBand::new(Grade::B, dec!(60), Decimal::ZERO),
                GradeBand::new(Grade::C, Decimal::ZERO, Decimal::ZERO),
            ],
            weights: ScoreWeights::default(),
            penalties: BehaviorPenalties::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSettings {
    pub min_trades_for_insights: usize,
    pub strong_win_rate: Decimal,
    pub weak_win_rate: Decimal,
    pub strong_risk_reward: Decimal,
    pub weak_risk_reward: Decimal,
    pub weak_profit_factor: Decimal,
    pub large_drawdown: Decimal,
    pub consistency_min_months: usize,
    pub strong_consistency: Decimal,
    pub weak_consistency: Decimal,
}

impl Default for InsightSettings {
    fn default() -> Self {
        Self {
            min_trades_for_insights: 5,
            strong_win_rate: dec!(60),
            weak_win_rate: dec!(40),
            strong_risk_reward: dec!(2),
            weak_risk_reward: dec!(1),
            weak_profit_factor: dec!(1),
            large_drawdown: dec!(500),
            consistency_min_months: 3,
            strong_consistency: dec!(75),
            weak_consistency: dec!(50),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSettings {
    pub min_trades: usize,
    pub recent_window: usize,
    pub base_score: i32,
    pub recent_profit_points: i32,
    pub win_rate_points: i32,
    pub consistency_threshold: Decimal,
    pub consistency_points: i32,
    pub consistency_penalty: i32,
    pub strong_profit_factor: Decimal,
    pub weak_profit_factor: Decimal,
    pub profit_factor_points: i32,
    pub positive_above: i32,
    pub negative_below: i32,
    pub max_confidence: u32,
    /// Predictions at or below this confidence stay out of the insight list.
    pub surface_above: u32,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            min_trades: 10,
            recent_window: 30,
            base_score: 50,
            recent_profit_points: 15,
            win_rate_points: 10,
            consistency_threshold: dec!(60),
            consistency_points: 10,
            consistency_penalty: 5,
            strong_profit_factor: dec!(1.5),
            weak_profit_factor: dec!(1),
            profit_factor_points: 10,
            positive_above: 60,
            negative_below: 40,
            max_confidence: 95,
            surface_above: 60,
        }
    }
}
