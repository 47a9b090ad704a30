use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

use super::context::AdvisoryContext;
use crate::analytics::{InsightCategory, RiskLevel};

/// Text completion provider behind the generative responder.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Answers a trader's question using an analysis context.
#[async_trait]
pub trait AdvisoryResponder: Send + Sync {
    fn name(&self) -> &'static str;

    async fn respond(&self, question: &str, context: &AdvisoryContext) -> String;
}

/// Question topics the templated responder knows how to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    WinRate,
    Risk,
    Drawdown,
    Psychology,
    Timing,
    Symbol,
    General,
}

impl Topic {
    /// First keyword group that matches wins, so the more specific topics
    /// are checked before the broad ones.
    pub fn classify(question: &str) -> Self {
        let q = question.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| q.contains(w));

        if has(&["drawdown", "losing streak", "down bad"]) {
            Topic::Drawdown
        } else if has(&["revenge", "emotion", "tilt", "psycholog", "discipline", "overtrad"]) {
            Topic::Psychology
        } else if has(&["win rate", "winrate", "accuracy", "how often"]) {
            Topic::WinRate
        } else if has(&["risk", "reward", "r:r", "stop", "position size", "sizing"]) {
            Topic::Risk
        } else if has(&["time", "session", "hour", "monday", "morning", "afternoon", "evening", "when"]) {
            Topic::Timing
        } else if has(&["symbol", "ticker", "pair", "instrument", "which market"]) {
            Topic::Symbol
        } else {
            Topic::General
        }
    }
}

/// Canned answers filled with the trader's own numbers. Always available.
#[derive(Debug, Clone, Default)]
pub struct TemplatedResponder;

impl TemplatedResponder {
    pub fn answer(&self, question: &str, context: &AdvisoryContext) -> String {
        let m = &context.metrics;
        if m.is_empty() {
            return "There are no trades in your journal yet. Log a few trades and ask again.".to_string();
        }

        match Topic::classify(question) {
            Topic::WinRate => {
                let verdict = if m.win_rate >= Decimal::from(50) {
                    "That is a solid base to build on."
                } else {
                    "Focus on being more selective with entries."
                };
                format!(
                    "You have won {} of {} trades, a {:.1}% win rate. {}",
                    m.winning_trades, m.total_trades, m.win_rate, verdict
                )
            }
            Topic::Risk => format!(
                "Your average winner is {:.2} and your average loser is {:.2}, a risk:reward of {:.2}. \
                 Profit factor is {:.2}. Aim to keep risk:reward at 2 or better.",
                m.avg_win, m.avg_loss, m.avg_risk_reward, m.profit_factor
            ),
            Topic::Drawdown => format!(
                "Your maximum drawdown is {:.2} and you are currently {:.2} below your equity peak. \
                 Your longest losing streak is {} trades.",
                m.max_drawdown, context.current_drawdown, context.streaks.max_loss_streak
            ),
            Topic::Psychology => {
                let emotional = &context.patterns.emotional_risk;
                let mut parts = vec![format!("Your emotional risk is {} (score {}).", emotional.level, emotional.score)];
                if context.patterns.revenge_trading.detected {
                    parts.push("You have re-entered bigger right after a large loss.".to_string());
                }
                if context.patterns.overtrading.detected {
                    parts.push(format!(
                        "You average {:.1} trades per day, which points to overtrading.",
                        context.patterns.overtrading.avg_trades_per_day
                    ));
                }
                if emotional.level != RiskLevel::Low {
                    parts.push(format!("Take a {} minute break before the next trade.", emotional.cooldown_minutes));
                }
                parts.join(" ")
            }
            Topic::Timing => {
                let mut parts = Vec::new();
                if let Some(edge) = &context.patterns.time_of_day {
                    parts.push(format!(
                        "Your best session is {} ({}) with an average of {:.2} per trade.",
                        edge.bucket.to_string().to_lowercase(),
                        edge.bucket.hours(),
                        edge.avg_profit
                    ));
                }
                if context.patterns.weekend_gap.detected {
                    parts.push(format!(
                        "Mondays average {:.2} per trade, well above the rest of the week.",
                        context.patterns.weekend_gap.monday_avg_profit
                    ));
                }
                if parts.is_empty() {
                    "No time of day stands out in your results yet.".to_string()
                } else {
                    parts.join(" ")
                }
            }
            Topic::Symbol => match &context.patterns.symbol_edge {
                Some(edge) => format!(
                    "{} is your strongest symbol: {:.1}% wins over {} trades versus {:.1}% overall.",
                    edge.symbol, edge.win_rate, edge.trades, edge.overall_win_rate
                ),
                None => "No single symbol clearly outperforms the rest of your trading yet.".to_string(),
            },
            Topic::General => self.general(context),
        }
    }

    fn general(&self, context: &AdvisoryContext) -> String {
        let m = &context.metrics;
        let mut answer = format!(
            "Across {} trades you have netted {:.2} with a {:.1}% win rate and a profit factor of {:.2}.",
            m.total_trades, m.net_profit, m.win_rate, m.profit_factor
        );
        if context.health.is_rated() {
            answer.push_str(&format!(" Your health score is {:.1}/100.", context.health.overall));
        }
        let focus = context
            .insights
            .iter()
            .find(|i| i.category != InsightCategory::Timing)
            .or_else(|| context.insights.first());
        if let Some(insight) = focus {
            answer.push_str(&format!(" Top priority: {}. {}", insight.title, insight.actionable));
        }
        answer
    }
}

#[async_trait]
impl AdvisoryResponder for TemplatedResponder {
    fn name(&self) -> &'static str {
        "templated"
    }

    async fn respond(&self, question: &str, context: &AdvisoryContext) -> String {
        self.answer(question, context)
    }
}

/// Sends the rendered context to a completion provider. Falls back to the
/// templated answer when the provider fails or returns nothing.
pub struct GenerativeResponder {
    client: Arc<dyn CompletionClient>,
    fallback: TemplatedResponder,
}

impl GenerativeResponder {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            fallback: TemplatedResponder,
        }
    }

    pub fn build_prompt(question: &str, context: &AdvisoryContext) -> String {
        format!(
            "You are a trading coach reviewing a trader's journal. Answer using only the data below. \
             Be specific and brief.\n\n{}\nQuestion: {}\n",
            context.render(),
            question.trim()
        )
    }
}

#[async_trait]
impl AdvisoryResponder for GenerativeResponder {
    fn name(&self) -> &'static str {
        "generative"
    }

    async fn respond(&self, question: &str, context: &AdvisoryContext) -> String {
        let prompt = Self::build_prompt(question, context);
        debug!("Requesting completion from {} ({} chars)", self.client.name(), prompt.len());

        match self.client.complete(&prompt).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => {
                warn!("{} returned an empty reply, using templated answer", self.client.name());
                self.fallback.answer(question, context)
            }
            Err(e) => {
                warn!("{} completion failed: {}, using templated answer", self.client.name(), e);
                self.fallback.answer(question, context)
            }
        }
    }
}

/// Generative when a completion client is configured, templated otherwise.
pub fn select_responder(client: Option<Arc<dyn CompletionClient>>) -> Box<dyn AdvisoryResponder> {
    match client {
        Some(client) => Box::new(GenerativeResponder::new(client)),
        None => Box::new(TemplatedResponder),
    }
}
