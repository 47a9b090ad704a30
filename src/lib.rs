pub mod advisor;
pub mod analytics;
pub mod config;
pub mod error;
pub mod session;
pub mod source;
pub mod types;

pub use crate::analytics::{AnalysisReport, InsightEngine};
pub use crate::config::{load_thresholds, AnalyticsThresholds, ThresholdProfile};
pub use crate::error::{AnalyticsError, RecordError, Result};
pub use crate::types::{RawTradeRecord, TradeRecord};
