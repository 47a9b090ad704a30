pub mod drawdown;
pub mod engine;
pub mod health;
pub mod insights;
pub mod metrics;
pub mod patterns;
pub mod prediction;

pub use drawdown::{DrawdownReport, DrawdownTracker, EquityPoint, WinLossStreaks};
pub use engine::{AnalysisReport, InsightEngine};
pub use health::{HealthScore, HealthScorer, SubScores};
pub use insights::{Insight, InsightCategory, InsightGenerator, InsightType, Priority};
pub use metrics::{Metrics, MetricsCalculator};
pub use patterns::{
    EmotionalRisk, EmotionalSignal, Overtrading, PatternDetector, PatternReport, RevengeTrading, RiskLevel, SymbolEdge,
    TimeBucket, TimeOfDayEdge, WeekendGap,
};
pub use prediction::{Outlook, Prediction, PredictionEngine};
