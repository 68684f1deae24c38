//! Prompt text sent to the providers.

use crate::events::lenient::Numeric;
use crate::events::{Event, EventPayload};
use serde_json::Value;

const SYSTEM_INSTRUCTION: &str = "\
You are an AI analyst for cryptocurrency token monitoring.
Your task is to analyze events related to token activity (price changes, large transfers, news, etc.)
and provide insights on potential impacts, risks, and market implications.
Be concise, analytical, and focus on actionable insights.";

const ANALYSIS_POINTS: &str = "\
1. Immediate impact on token value/sentiment
2. Potential risks or opportunities
3. Recommended monitoring focus areas
";

fn or<'a>(value: &'a Option<String>, placeholder: &'a str) -> &'a str {
    value.as_deref().unwrap_or(placeholder)
}

fn num(value: &Option<Numeric>, placeholder: &str) -> String {
    value
        .as_ref()
        .map(Numeric::to_string)
        .unwrap_or_else(|| placeholder.to_string())
}

/// Describe one event. Missing fields render as `unknown`, `N/A` or `0`.
pub fn build_event_prompt(event: &Event) -> String {
    match &event.payload {
        EventPayload::WalletTransfer(p) => format!(
            "Large wallet transfer detected:\n\
             - From: {}\n\
             - To: {}\n\
             - Amount: {} tokens\n\
             - Transaction: {}\n\
             - Timestamp: {}\n",
            or(&p.from_address, "unknown"),
            or(&p.to_address, "unknown"),
            num(&p.amount, "0"),
            or(&p.tx_hash, "N/A"),
            or(&p.timestamp, "N/A"),
        ),
        EventPayload::PriceChange(p) => format!(
            "Significant price change detected:\n\
             - Exchange: {}\n\
             - Previous Price: ${}\n\
             - New Price: ${}\n\
             - Change: {}%\n\
             - Volume: {}\n",
            or(&p.exchange, "unknown"),
            num(&p.old_price, "0"),
            num(&p.new_price, "0"),
            num(&p.change_percent, "0"),
            num(&p.volume, "N/A"),
        ),
        EventPayload::VolumeSpike(p) => format!(
            "Trading volume spike detected:\n\
             - Exchange: {}\n\
             - Previous Volume: {}\n\
             - New Volume: {}\n\
             - Increase: {}%\n",
            or(&p.exchange, "unknown"),
            num(&p.old_volume, "0"),
            num(&p.new_volume, "0"),
            num(&p.increase_percent, "0"),
        ),
        EventPayload::NewsUpdate(p) => format!(
            "Relevant news article detected:\n\
             - Title: {}\n\
             - Source: {}\n\
             - Summary: {}\n\
             - Relevance Score: {}\n\
             - Sentiment: {}\n",
            or(&p.title, "N/A"),
            or(&p.source, "unknown"),
            or(&p.summary, "N/A"),
            num(&p.relevance_score, "0"),
            num(&p.sentiment_score, "0"),
        ),
        EventPayload::Unknown { kind, data } => format!(
            "Unknown event type: {kind}\nData: {}",
            Value::Object(data.clone())
        ),
    }
}

/// Wrap an event prompt with the analyst framing and, when there is one, the
/// token's previous context.
pub fn build_full_prompt(event_prompt: &str, context_summary: &str) -> String {
    if context_summary.trim().is_empty() {
        format!(
            "{SYSTEM_INSTRUCTION}\n\n\
             Event to Analyze:\n{event_prompt}\n\n\
             Provide analysis on:\n{ANALYSIS_POINTS}"
        )
    } else {
        format!(
            "{SYSTEM_INSTRUCTION}\n\n\
             Previous Context:\n{context_summary}\n\n\
             New Event:\n{event_prompt}\n\n\
             Analyze this event in the context of previous information. Provide insights on:\n\
             {ANALYSIS_POINTS}"
        )
    }
}
