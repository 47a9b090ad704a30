use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::thresholds::AnalyticsThresholds;

/// Named threshold presets for journals with different trading styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdProfile {
    /// Calibrated defaults for discretionary day and swing traders.
    Standard,

    /// Tighter behavior limits for small accounts and funded-challenge rules.
    /// Flags smaller revenge losses and lower trade frequency.
    Strict,

    /// Looser limits for scalpers who legitimately take many small trades.
    Lenient,
}

impl ThresholdProfile {
    pub fn name(&self) -> &str {
        match self {
            Self::Standard => "Standard",
            Self::Strict => "Strict",
            Self::Lenient => "Lenient",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Standard => "Balanced limits for day and swing trading journals.",
            Self::Strict => "Small-account limits: $50 revenge threshold, 6 trades/day, $250 drawdown alert.",
            Self::Lenient => "Scalping limits: $200 revenge threshold, 25 trades/day, $1000 drawdown alert.",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "default" => Some(Self::Standard),
            "strict" => Some(Self::Strict),
            "lenient" | "scalper" => Some(Self::Lenient),
            _ => None,
        }
    }

    pub fn thresholds(&self) -> AnalyticsThresholds {
        match self {
            Self::Standard => AnalyticsThresholds::default(),
            Self::Strict => {
                let mut t = AnalyticsThresholds::default();
                t.patterns.revenge_loss_threshold = dec!(50);
                t.patterns.revenge_window_hours = 4;
                t.patterns.revenge_size_multiplier = dec!(1.25);
                t.patterns.overtrading_max_trades_per_day = dec!(6);
                t.patterns.emotional.high_risk_score = 50;
                t.drawdown.acceleration_min_window_loss = dec!(50);
                t.insights.large_drawdown = dec!(250);
                t
            }
            Self::Lenient => {
                let mut t = AnalyticsThresholds::default();
                t.patterns.revenge_loss_threshold = dec!(200);
                t.patterns.revenge_window_hours = 1;
                t.patterns.overtrading_max_trades_per_day = dec!(25);
                t.patterns.emotional.rapid_fire_minutes = 5;
                t.drawdown.acceleration_min_window_loss = dec!(250);
                t.insights.large_drawdown = dec!(1000);
                t
            }
        }
    }
}

impl Default for ThresholdProfile {
    fn default() -> Self {
        Self::Standard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_thresholds() {
        let strict = ThresholdProfile::Strict.thresholds();
        assert_eq!(strict.patterns.revenge_loss_threshold, dec!(50));
        assert_eq!(strict.insights.large_drawdown, dec!(250));
        assert!(strict.validate().is_ok());

        let lenient = ThresholdProfile::Lenient.thresholds();
        assert_eq!(lenient.patterns.overtrading_max_trades_per_day, dec!(25));
        assert!(lenient.validate().is_ok());

        assert_eq!(ThresholdProfile::Standard.thresholds(), AnalyticsThresholds::default());
    }

    #[test]
    fn test_profile_metadata() {
        assert_eq!(ThresholdProfile::parse("STRICT"), Some(ThresholdProfile::Strict));
        assert_eq!(ThresholdProfile::parse("scalper"), Some(ThresholdProfile::Lenient));
        assert_eq!(ThresholdProfile::parse("yolo"), None);
        assert_eq!(ThresholdProfile::Lenient.name(), "Lenient");
    }
}
