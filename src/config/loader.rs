use std::path::Path;
use tracing::{debug, info};

use super::profiles::ThresholdProfile;
use super::thresholds::AnalyticsThresholds;
use crate::error::{AnalyticsError, Result};

const ENV_PREFIX: &str = "INSIGHTS";

/// Layers the profile defaults, an optional TOML file and `INSIGHTS__*`
/// environment overrides, then validates the result.
///
/// Nested keys use a double underscore, e.g.
/// `INSIGHTS__PATTERNS__REVENGE_LOSS_THRESHOLD=75`. Reading `.env` is left to
/// the binary.
pub fn load_thresholds(profile: ThresholdProfile, file: Option<&Path>) -> Result<AnalyticsThresholds> {
    let defaults = profile.thresholds();
    let mut builder = ::config::Config::builder().add_source(::config::Config::try_from(&defaults)?);

    if let Some(path) = file {
        debug!("Reading thresholds from {}", path.display());
        builder = builder.add_source(::config::File::from(path).required(true));
    }

    let settings = builder
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let thresholds: AnalyticsThresholds = settings.try_deserialize()?;
    thresholds.validate().map_err(AnalyticsError::InvalidThresholds)?;

    info!(
        "Thresholds loaded: profile={}, ruleset v{}, utc offset {} min",
        profile.name(),
        thresholds.version,
        thresholds.utc_offset_minutes
    );
    Ok(thresholds)
}

/// Serializes thresholds as TOML so they can be saved, edited and reloaded.
pub fn thresholds_to_toml(thresholds: &AnalyticsThresholds) -> std::result::Result<String, toml::ser::Error> {
    toml::to_string_pretty(thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use std::sync::Mutex;

    /// Serializes tests that read or modify `INSIGHTS__*` variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_load_profile_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let thresholds = load_thresholds(ThresholdProfile::Strict, None).unwrap();
        assert_eq!(thresholds.patterns.revenge_loss_threshold, dec!(50));
        assert_eq!(thresholds.grading.performance_bands.len(), 5);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut defaults = AnalyticsThresholds::default();
        defaults.insights.large_drawdown = dec!(750);
        defaults.patterns.symbol_min_trades = 8;
        let text = thresholds_to_toml(&defaults).unwrap();

        let path = std::env::temp_dir().join(format!("insights-thresholds-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(text.as_bytes()).unwrap();

        let loaded = load_thresholds(ThresholdProfile::Standard, Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.insights.large_drawdown, dec!(750));
        assert_eq!(loaded.patterns.symbol_min_trades, 8);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut broken = AnalyticsThresholds::default();
        broken.prediction.max_confidence = 150;
        let text = thresholds_to_toml(&broken).unwrap();

        let path = std::env::temp_dir().join(format!("insights-invalid-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, text).unwrap();

        let err = load_thresholds(ThresholdProfile::Standard, Some(&path)).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, AnalyticsError::InvalidThresholds(_)));
    }

    #[test]
    fn test_environment_overrides_file_and_profile() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("INSIGHTS__PATTERNS__REVENGE_LOSS_THRESHOLD", "75");
        std::env::set_var("INSIGHTS__PATTERNS__SYMBOL_MIN_TRADES", "9");

        let loaded = load_thresholds(ThresholdProfile::Strict, None);

        std::env::remove_var("INSIGHTS__PATTERNS__REVENGE_LOSS_THRESHOLD");
        std::env::remove_var("INSIGHTS__PATTERNS__SYMBOL_MIN_TRADES");

        let thresholds = loaded.unwrap();
        assert_eq!(thresholds.patterns.revenge_loss_threshold, dec!(75));
        assert_eq!(thresholds.patterns.symbol_min_trades, 9);
        // Untouched keys keep the profile value
        assert_eq!(thresholds.grading.performance_bands.len(), 5);
    }
}
