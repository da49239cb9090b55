//! Coaching context builder.
//!
//! Builds the chat-completion request body handed to the external coaching
//! collaborator from an analysis report's trades and findings. Sending the
//! request is the caller's concern.

use bias_core::config::CoachConfig;
use bias_core::{AnalysisReport, BiasFinding, Error, Result, TradeRow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Chat participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Chat-completion request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl ChatRequest {
    /// Build the request: system prompt with trade and bias context, prior
    /// history, then the user's message.
    ///
    /// Fails with [`Error::CoachNotConfigured`] when no API key is set.
    pub fn build(
        config: &CoachConfig,
        message: &str,
        trades: &[TradeRow],
        biases: &[BiasFinding],
        history: &[ChatMessage],
    ) -> Result<Self> {
        if !config.is_configured() {
            return Err(Error::CoachNotConfigured);
        }

        let prompt = system_prompt(
            &trade_summary(trades, config.max_assets_in_summary),
            &bias_summary(biases),
        );
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::new(Role::System, prompt));
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::new(Role::User, message));
        debug!(history = history.len(), model = %config.model, "coach request built");

        Ok(Self {
            model: config.model.clone(),
            messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Build the request from a finished report.
    pub fn from_report(
        config: &CoachConfig,
        message: &str,
        report: &AnalysisReport,
        history: &[ChatMessage],
    ) -> Result<Self> {
        Self::build(config, message, &report.trades, &report.biases, history)
    }
}

/// Count, total P/L, win rate and the first distinct assets traded.
pub fn trade_summary(trades: &[TradeRow], max_assets: usize) -> String {
    let total_pnl = trades.iter().filter_map(|t| t.p_l).fold(0.0, |acc, p| acc + p);
    let mut summary = format!(
        "The trader has {} recent trades. Total P/L: ${total_pnl:.2}. ",
        trades.len()
    );
    if trades.is_empty() {
        summary.push_str("No trading data available yet.");
        return summary;
    }

    let wins = trades.iter().filter(|t| t.p_l.is_some_and(|p| p > 0.0)).count();
    let win_rate = wins as f64 / trades.len() as f64 * 100.0;
    let mut assets: Vec<&str> = Vec::new();
    for trade in trades {
        if assets.len() == max_assets {
            break;
        }
        if !assets.contains(&trade.asset.as_str()) {
            assets.push(&trade.asset);
        }
    }
    summary.push_str(&format!(
        "Win rate: {win_rate:.0}%. Most traded assets: {}.",
        assets.join(", ")
    ));
    summary
}

/// `title (severity): description` per finding, joined with `; `.
pub fn bias_summary(biases: &[BiasFinding]) -> String {
    if biases.is_empty() {
        return "No biases detected yet.".to_string();
    }
    let parts: Vec<String> = biases
        .iter()
        .map(|b| format!("{} ({}): {}", b.title, b.severity.as_str(), b.description))
        .collect();
    format!("Detected biases: {}", parts.join("; "))
}

fn system_prompt(trade_summary: &str, bias_summary: &str) -> String {
    format!(
        "You are an expert trading coach. Your role is to:\n\
         1. Analyze trading behavior and identify psychological biases\n\
         2. Provide personalized, actionable advice\n\
         3. Help traders improve discipline and emotional control\n\
         4. Suggest portfolio optimization strategies\n\
         5. Perform sentiment analysis on trader notes\n\
         6. Predict potential bias-triggering situations\n\
         \n\
         Current trader context:\n\
         {trade_summary}\n\
         {bias_summary}\n\
         \n\
         Be empathetic but direct. Use specific data from their trades when possible. \
         Keep responses concise (2-4 paragraphs max). Reference behavioral finance concepts."
    )
}
