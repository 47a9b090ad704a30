use async_trait::async_trait;
use std::cmp::Reverse;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::types::RawTradeRecord;

/// Supplies the journal's trades for one (user, strategy) pair. Records come
/// back unvalidated; sanitization happens in the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradeSource: Send + Sync {
    async fn fetch_trades(&self, user_id: &str, strategy_id: &str, limit: usize) -> anyhow::Result<Vec<RawTradeRecord>>;
}

/// Reads a JSON array of trade records exported from the journal.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TradeSource for JsonFileSource {
    /// Most recent `limit` records for the owner, newest first.
    async fn fetch_trades(&self, user_id: &str, strategy_id: &str, limit: usize) -> anyhow::Result<Vec<RawTradeRecord>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", self.path.display(), e))?;
        let elements: Vec<serde_json::Value> = serde_json::from_str(&text)?;
        let total = elements.len();

        // A malformed element is skipped, never the whole file
        let records = elements
            .into_iter()
            .enumerate()
            .filter_map(|(index, element)| match serde_json::from_value::<RawTradeRecord>(element) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping element {} of {}: {}", index, self.path.display(), e);
                    None
                }
            });

        let mut owned: Vec<RawTradeRecord> = records
            .filter(|r| r.matches_owner(user_id, strategy_id))
            .collect();

        // Undated records sort after every dated one
        owned.sort_by_key(|r| Reverse(r.parsed_date()));
        owned.truncate(limit);

        debug!(
            "Loaded {} of {} records from {} for {}/{}",
            owned.len(),
            total,
            self.path.display(),
            user_id,
            strategy_id
        );
        Ok(owned)
    }
}
