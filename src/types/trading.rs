use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    /// Journal exports use either order sides or position directions.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "buy" | "long" => Some(Side::Buy),
            "sell" | "short" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Win/loss classification driven purely by the sign of realized profit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Breakeven,
}

impl Outcome {
    pub fn from_profit(profit: Decimal) -> Self {
        if profit > Decimal::ZERO {
            Outcome::Win
        } else if profit < Decimal::ZERO {
            Outcome::Loss
        } else {
            Outcome::Breakeven
        }
    }

    pub fn is_win(&self) -> bool {
        matches!(self, Outcome::Win)
    }

    pub fn is_loss(&self) -> bool {
        matches!(self, Outcome::Loss)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "Win"),
            Outcome::Loss => write!(f, "Loss"),
            Outcome::Breakeven => write!(f, "Breakeven"),
        }
    }
}
