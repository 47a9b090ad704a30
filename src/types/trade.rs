use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use tracing::{debug, warn};

use super::trading::{Outcome, Side};
use crate::error::RecordError;

/// Largest accepted magnitude for any numeric field.
pub const MAX_VALUE_MAGNITUDE: i64 = 1_000_000_000_000_000;

/// Numeric fields are rounded to this many decimal places on ingestion.
pub const VALUE_SCALE: u32 = 10;

/// One journal trade after validation. Every analytics stage works on these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub date: DateTime<Utc>,
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub quantity: Decimal,
    pub profit: Decimal,
    pub strategy_id: String,
    pub user_id: String,
}

impl TradeRecord {
    pub fn new(id: &str, date: DateTime<Utc>, symbol: &str, profit: Decimal) -> Self {
        Self {
            id: id.to_string(),
            date,
            symbol: symbol.to_string(),
            side: Side::Buy,
            entry_price: Decimal::ZERO,
            exit_price: Decimal::ZERO,
            quantity: Decimal::ONE,
            profit,
            strategy_id: String::new(),
            user_id: String::new(),
        }
    }

    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_prices(mut self, side: Side, entry_price: Decimal, exit_price: Decimal) -> Self {
        self.side = side;
        self.entry_price = entry_price;
        self.exit_price = exit_price;
        self
    }

    pub fn with_owner(mut self, user_id: &str, strategy_id: &str) -> Self {
        self.user_id = user_id.to_string();
        self.strategy_id = strategy_id.to_string();
        self
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::from_profit(self.profit)
    }

    pub fn is_win(&self) -> bool {
        self.profit > Decimal::ZERO
    }

    pub fn is_loss(&self) -> bool {
        self.profit < Decimal::ZERO
    }

    /// Entry time in the journal owner's local offset.
    pub fn local_date(&self, offset: FixedOffset) -> DateTime<FixedOffset> {
        self.date.with_timezone(&offset)
    }
}

/// Sorts a copy of the trades ascending by entry time. Equal timestamps keep
/// their input order.
pub fn chronological(trades: &[TradeRecord]) -> Vec<TradeRecord> {
    let mut sorted = trades.to_vec();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));
    sorted
}

/// A trade as it arrives from the journal store or an export file: loosely
/// typed, possibly incomplete. Text fields accept any JSON scalar so one
/// oddly typed record cannot fail the batch it arrived in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTradeRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub side: Option<String>,
    #[serde(default, alias = "entry_price")]
    pub entry_price: Option<serde_json::Value>,
    #[serde(default, alias = "exit_price")]
    pub exit_price: Option<serde_json::Value>,
    #[serde(default)]
    pub quantity: Option<serde_json::Value>,
    #[serde(default)]
    pub profit: Option<serde_json::Value>,
    #[serde(default, alias = "strategy_id", deserialize_with = "lenient_text")]
    pub strategy_id: Option<String>,
    #[serde(default, alias = "user_id", deserialize_with = "lenient_text")]
    pub user_id: Option<String>,
}

/// Strings pass through, other non-null values keep their JSON text and are
/// judged later by `TryFrom`.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl RawTradeRecord {
    /// Single-owner exports omit the owner fields; those records match any
    /// requester.
    pub fn matches_owner(&self, user_id: &str, strategy_id: &str) -> bool {
        self.user_id.as_deref().map_or(true, |u| u == user_id)
            && self.strategy_id.as_deref().map_or(true, |s| s == strategy_id)
    }

    /// Sort key for "most recent first" selection; unparseable dates sort last.
    pub fn parsed_date(&self) -> Option<DateTime<Utc>> {
        self.date.as_deref().and_then(parse_timestamp)
    }
}

impl TryFrom<RawTradeRecord> for TradeRecord {
    type Error = RecordError;

    fn try_from(raw: RawTradeRecord) -> Result<Self, Self::Error> {
        let date_str = raw.date.ok_or(RecordError::MissingField { field: "date" })?;
        let date = parse_timestamp(&date_str).ok_or(RecordError::InvalidDate { value: date_str })?;

        let symbol = raw
            .symbol
            .filter(|s| !s.trim().is_empty())
            .ok_or(RecordError::MissingField { field: "symbol" })?;

        let side_str = raw.side.ok_or(RecordError::MissingField { field: "side" })?;
        let side = Side::parse(&side_str).ok_or(RecordError::InvalidSide { value: side_str })?;

        let profit = required_decimal(raw.profit, "profit")?;
        let quantity = required_decimal(raw.quantity, "quantity")?;
        if quantity <= Decimal::ZERO {
            return Err(RecordError::NonPositive { field: "quantity", value: quantity });
        }
        let entry_price = required_decimal(raw.entry_price, "entryPrice")?;
        // Unfilled exits are journaled without an exit price.
        let exit_price = match raw.exit_price {
            Some(serde_json::Value::Null) | None => entry_price,
            Some(value) => parse_decimal(&value, "exitPrice")?,
        };

        Ok(TradeRecord {
            id: raw.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            date,
            symbol: symbol.trim().to_uppercase(),
            side,
            entry_price,
            exit_price,
            quantity,
            profit,
            strategy_id: raw.strategy_id.unwrap_or_default(),
            user_id: raw.user_id.unwrap_or_default(),
        })
    }
}

/// Records rejected during sanitization, with the reason.
#[derive(Debug, Clone)]
pub struct RejectedRecord {
    pub id: Option<String>,
    pub reason: RecordError,
}

/// Converts raw records, dropping the malformed ones instead of failing the
/// whole batch.
pub fn sanitize_records(raw: Vec<RawTradeRecord>) -> (Vec<TradeRecord>, Vec<RejectedRecord>) {
    let mut valid = Vec::with_capacity(raw.len());
    let mut rejected = Vec::new();

    for record in raw {
        let id = record.id.clone();
        match TradeRecord::try_from(record) {
            Ok(trade) => valid.push(trade),
            Err(reason) => {
                warn!("Excluding trade {}: {}", id.as_deref().unwrap_or("<no id>"), reason);
                rejected.push(RejectedRecord { id, reason });
            }
        }
    }

    debug!("Sanitized trades: {} valid, {} rejected", valid.len(), rejected.len());
    (valid, rejected)
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn required_decimal(value: Option<serde_json::Value>, field: &'static str) -> Result<Decimal, RecordError> {
    match value {
        Some(serde_json::Value::Null) | None => Err(RecordError::MissingField { field }),
        Some(value) => parse_decimal(&value, field),
    }
}

fn parse_decimal(value: &serde_json::Value, field: &'static str) -> Result<Decimal, RecordError> {
    let text = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        other => {
            return Err(RecordError::NonNumeric { field, value: other.to_string() });
        }
    };

    let value = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| RecordError::NonNumeric { field, value: text })?
        .round_dp(VALUE_SCALE);

    // Bounded inputs keep every aggregate well inside Decimal's range
    let limit = Decimal::from(MAX_VALUE_MAGNITUDE);
    if value.abs() > limit {
        return Err(RecordError::OutOfRange { field, value, limit });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn raw(profit: serde_json::Value, date: &str) -> RawTradeRecord {
        RawTradeRecord {
            id: Some("t1".to_string()),
            date: Some(date.to_string()),
            symbol: Some("eurusd".to_string()),
            side: Some("buy".to_string()),
            entry_price: Some(json!(1.0850)),
            exit_price: Some(json!("1.0900")),
            quantity: Some(json!(2)),
            profit: Some(profit),
            strategy_id: Some("s1".to_string()),
            user_id: Some("u1".to_string()),
        }
    }

    #[test]
    fn test_converts_valid_record() {
        let trade = TradeRecord::try_from(raw(json!("125.50"), "2024-03-04T09:30:00Z")).unwrap();
        assert_eq!(trade.profit, dec!(125.50));
        assert_eq!(trade.exit_price, dec!(1.0900));
        assert_eq!(trade.symbol, "EURUSD");
        assert_eq!(trade.date.hour(), 9);
        assert!(trade.is_win());
    }

    #[test]
    fn test_rejects_malformed_fields() {
        let err = TradeRecord::try_from(raw(json!("12abc"), "2024-03-04")).unwrap_err();
        assert!(matches!(err, RecordError::NonNumeric { field: "profit", .. }));

        let err = TradeRecord::try_from(raw(json!(10), "yesterday")).unwrap_err();
        assert!(matches!(err, RecordError::InvalidDate { .. }));

        let mut missing = raw(json!(10), "2024-03-04");
        missing.quantity = None;
        let err = TradeRecord::try_from(missing).unwrap_err();
        assert_eq!(err, RecordError::MissingField { field: "quantity" });
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        for qty in [json!(0), json!("-1.5")] {
            let mut record = raw(json!(-300), "2024-03-04");
            record.quantity = Some(qty);
            let err = TradeRecord::try_from(record).unwrap_err();
            assert!(matches!(err, RecordError::NonPositive { field: "quantity", .. }));
        }

        // Rounds to zero at the ingestion scale
        let mut dust = raw(json!(1), "2024-03-04");
        dust.quantity = Some(json!("0.00000000001"));
        assert!(TradeRecord::try_from(dust).is_err());
    }

    #[test]
    fn test_numeric_range_and_scale() {
        let trade = TradeRecord::try_from(raw(json!("-0.0000000000000000000000000001"), "2024-03-04")).unwrap();
        assert_eq!(trade.profit, Decimal::ZERO);
        assert!(!trade.is_loss());

        let trade = TradeRecord::try_from(raw(json!("12.123456789012345"), "2024-03-04")).unwrap();
        assert_eq!(trade.profit, dec!(12.1234567890));

        let err = TradeRecord::try_from(raw(json!("1e20"), "2024-03-04")).unwrap_err();
        assert!(matches!(err, RecordError::OutOfRange { field: "profit", .. }));

        let mut huge_entry = raw(json!(5), "2024-03-04");
        huge_entry.entry_price = Some(json!("-79228162514264337593543950335"));
        let err = TradeRecord::try_from(huge_entry).unwrap_err();
        assert!(matches!(err, RecordError::OutOfRange { field: "entryPrice", .. }));
    }

    #[test]
    fn test_deserialize_tolerates_scalar_types() {
        let record: RawTradeRecord = serde_json::from_value(json!({
            "id": 7,
            "date": 1714560000000u64,
            "symbol": "ES",
            "side": true,
            "userId": null,
            "profit": 10
        }))
        .unwrap();
        assert_eq!(record.id.as_deref(), Some("7"));
        assert_eq!(record.date.as_deref(), Some("1714560000000"));
        assert_eq!(record.side.as_deref(), Some("true"));
        assert!(record.user_id.is_none());

        let err = TradeRecord::try_from(record).unwrap_err();
        assert!(matches!(err, RecordError::InvalidDate { .. }));
    }

    #[test]
    fn test_missing_exit_defaults_to_entry() {
        let mut record = raw(json!(0), "2024-03-04 10:00:00");
        record.exit_price = None;
        let trade = TradeRecord::try_from(record).unwrap();
        assert_eq!(trade.exit_price, trade.entry_price);
    }

    #[test]
    fn test_sanitize_keeps_valid_records() {
        let (valid, rejected) = sanitize_records(vec![
            raw(json!(10), "2024-03-04"),
            raw(json!(true), "2024-03-05"),
            raw(json!(-4), "not a date"),
        ]);
        assert_eq!(valid.len(), 1);
        assert_eq!(rejected.len(), 2);
    }

    #[test]
    fn test_owner_matching() {
        let record = raw(json!(1), "2024-03-04");
        assert!(record.matches_owner("u1", "s1"));
        assert!(!record.matches_owner("u2", "s1"));

        let unowned = RawTradeRecord { user_id: None, strategy_id: None, ..record };
        assert!(unowned.matches_owner("anyone", "anything"));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let date_only = parse_timestamp("2024-01-15").unwrap();
        assert_eq!(date_only.day(), 15);
        assert_eq!(date_only.hour(), 0);

        let offset = parse_timestamp("2024-01-15T10:00:00+02:00").unwrap();
        assert_eq!(offset.hour(), 8);

        assert!(parse_timestamp("15/01/2024").is_none());
    }

    #[test]
    fn test_chronological_is_stable() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let trades = vec![
            TradeRecord::new("b", t, "X", dec!(1)),
            TradeRecord::new("a", t - chrono::Duration::hours(1), "X", dec!(1)),
            TradeRecord::new("c", t, "X", dec!(1)),
        ];
        let ids: Vec<_> = chronological(&trades).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
