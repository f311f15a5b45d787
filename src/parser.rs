use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::dispatch::ParsedQuery;
use crate::sanitize::is_safe_prompt;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const LLM_TIMEOUT_SECS: u64 = 20;

const SYSTEM_TEMPLATE: &str = r#"You are a football-statistics assistant.
Return ONLY valid JSON conforming to the following schema:
{
 "intent": "<one of: standings, fixture, match_events, player_stats, bracket, unsupported>",
 "sport": "<one of: football, basketball, rugby, f1, other>",
 "league_name": "<text|null>",
 "team_a": "<text|null>",
 "team_b": "<text|null>",
 "player_name": "<text|null>",
 "season": "<text|null>",
 "date": "<YYYY-MM-DD|null>",
 "stage": "<text|null>",
 "stats": ["<requested stat tokens, may be empty>"],
 "fixture_mode": "<one of: next, last, specific, season, team_next, team_last|null>",
 "count": <integer|null>
}
Do not wrap the JSON in triple backticks or explanations."#;

/// (user, assistant-json) example turns pinning down the extraction shape.
const FEW_SHOT: &[(&str, &str)] = &[
    (
        "Show me the Premier League standings for 2024/25.",
        r#"{"intent":"standings","sport":"football","league_name":"Premier League","team_a":null,"team_b":null,"player_name":null,"season":"2024","date":null,"stage":null,"stats":[],"fixture_mode":null,"count":null}"#,
    ),
    (
        "What was the score for Chelsea vs Manchester United on 2025-05-16?",
        r#"{"intent":"fixture","sport":"football","league_name":"Premier League","team_a":"Chelsea","team_b":"Manchester United","player_name":null,"season":null,"date":"2025-05-16","stage":null,"stats":[],"fixture_mode":"specific","count":null}"#,
    ),
    (
        "How many goals did Lionel Messi score in Ligue 1 in 2020?",
        r#"{"intent":"player_stats","sport":"football","league_name":"Ligue 1","team_a":null,"team_b":null,"player_name":"Lionel Messi","season":"2020","date":null,"stage":null,"stats":["goals"],"fixture_mode":null,"count":null}"#,
    ),
    (
        "Give me the yellow cards in Real Madrid vs Barcelona on 2024-10-28 in La Liga.",
        r#"{"intent":"match_events","sport":"football","league_name":"La Liga","team_a":"Real Madrid","team_b":"Barcelona","player_name":null,"season":null,"date":"2024-10-28","stage":null,"stats":["yellow_cards"],"fixture_mode":null,"count":null}"#,
    ),
    (
        "Show me the Champions League bracket for 2022/23.",
        r#"{"intent":"bracket","sport":"football","league_name":"Champions League","team_a":null,"team_b":null,"player_name":null,"season":"2022","date":null,"stage":null,"stats":[],"fixture_mode":null,"count":null}"#,
    ),
    (
        "Show me NBA standings.",
        r#"{"intent":"unsupported","sport":"basketball","league_name":null,"team_a":null,"team_b":null,"player_name":null,"season":null,"date":null,"stage":null,"stats":[],"fixture_mode":null,"count":null}"#,
    ),
];

/// Intent extraction via a chat-completions call. This never fails: any
/// problem (unsafe prompt, missing key, transport fault, malformed reply)
/// degrades to the unsupported sentinel and the dispatcher answers with its
/// fixed scope message.
pub struct QueryParser {
    client: Option<Client>,
    key: Option<String>,
    model: String,
}

impl QueryParser {
    pub fn new(config: &ApiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(LLM_TIMEOUT_SECS))
            .build()
            .ok();
        Self {
            client,
            key: config.openai_key.clone(),
            model: config.openai_model.clone(),
        }
    }

    pub fn parse_user_prompt(&self, prompt: &str) -> ParsedQuery {
        if !is_safe_prompt(prompt) {
            warn!("prompt rejected by sanitizer");
            return ParsedQuery::unsupported();
        }
        let (Some(client), Some(key)) = (self.client.as_ref(), self.key.as_deref()) else {
            warn!("no OPENAI_API_KEY configured, cannot parse free text");
            return ParsedQuery::unsupported();
        };
        match self.request(client, key, prompt) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(%err, "intent extraction failed");
                ParsedQuery::unsupported()
            }
        }
    }

    fn request(&self, client: &Client, key: &str, prompt: &str) -> Result<ParsedQuery> {
        let mut messages = vec![json!({"role": "system", "content": SYSTEM_TEMPLATE})];
        for (user, assistant) in FEW_SHOT {
            messages.push(json!({"role": "user", "content": user}));
            messages.push(json!({"role": "assistant", "content": assistant}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let body = json!({
            "model": self.model,
            "temperature": 0.0,
            "response_format": {"type": "json_object"},
            "messages": messages,
        });

        let resp = client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(key)
            .json(&body)
            .send()
            .context("chat completion request failed")?;
        let status = resp.status();
        let text = resp.text().context("chat completion body unreadable")?;
        if !status.is_success() {
            return Err(anyhow!("chat completion http {status}"));
        }

        let value: Value = serde_json::from_str(&text).context("chat completion not json")?;
        let content = value
            .get("choices")
            .and_then(|v| v.as_array())
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .ok_or_else(|| anyhow!("chat completion missing content"))?;

        let parsed = parse_extraction(content)?;
        debug!(?parsed, "intent extracted");
        Ok(parsed)
    }
}

/// Pulls the JSON object out of the model reply (tolerating stray fences or
/// prose around it) and coerces "absent" spellings to real absences.
pub fn parse_extraction(content: &str) -> Result<ParsedQuery> {
    let start = content
        .find('{')
        .ok_or_else(|| anyhow!("no JSON object in reply"))?;
    let end = content
        .rfind('}')
        .ok_or_else(|| anyhow!("no JSON object in reply"))?;
    if end < start {
        return Err(anyhow!("no JSON object in reply"));
    }
    let mut parsed: ParsedQuery =
        serde_json::from_str(&content[start..=end]).context("extraction json mismatch")?;
    scrub(&mut parsed.league_name);
    scrub(&mut parsed.team_a);
    scrub(&mut parsed.team_b);
    scrub(&mut parsed.player_name);
    scrub(&mut parsed.season);
    scrub(&mut parsed.date);
    scrub(&mut parsed.stage);
    parsed.stats.retain(|token| !token.trim().is_empty());
    Ok(parsed)
}

/// The model occasionally spells a missing field as "" or "null"; absence
/// must be a real `None` downstream.
fn scrub(field: &mut Option<String>) {
    if let Some(value) = field {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
            *field = None;
        } else if trimmed.len() != value.len() {
            *field = Some(trimmed.to_string());
        }
    }
}
