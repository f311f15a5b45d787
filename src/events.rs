use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Numeric fixture-statistic categories we will relay, exactly as the
/// provider spells them. Anything else in the payload is dropped.
pub const STAT_ALLOW_LIST: &[&str] = &[
    "Shots on Goal",
    "Total Shots",
    "Ball Possession",
    "Corner Kicks",
    "Fouls",
    "Offsides",
    "Yellow Cards",
    "Red Cards",
    "Total passes",
    "Passes %",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub minute: i64,
    pub extra: Option<i64>,
    pub team: String,
    pub player: String,
    pub assist: Option<String>,
    pub kind: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStats {
    pub team: String,
    pub stats: Vec<(String, String)>,
}

pub fn convert_events(raw: &Value) -> Vec<MatchEvent> {
    let mut out = Vec::new();
    let Some(rows) = raw.get("response").and_then(|v| v.as_array()) else {
        return out;
    };
    for row in rows {
        if let Some(event) = parse_event(row) {
            out.push(event);
        }
    }
    out
}

fn parse_event(v: &Value) -> Option<MatchEvent> {
    let time = v.get("time")?;
    Some(MatchEvent {
        minute: time.get("elapsed").and_then(|x| x.as_i64()).unwrap_or(0),
        extra: time.get("extra").and_then(|x| x.as_i64()),
        team: v
            .get("team")
            .and_then(|t| t.get("name"))
            .and_then(|x| x.as_str())
            .unwrap_or_default()
            .to_string(),
        player: v
            .get("player")
            .and_then(|p| p.get("name"))
            .and_then(|x| x.as_str())
            .unwrap_or_default()
            .to_string(),
        assist: v
            .get("assist")
            .and_then(|a| a.get("name"))
            .and_then(|x| x.as_str())
            .map(|s| s.to_string()),
        kind: v
            .get("type")
            .and_then(|x| x.as_str())
            .unwrap_or_default()
            .to_string(),
        detail: v
            .get("detail")
            .and_then(|x| x.as_str())
            .unwrap_or_default()
            .to_string(),
    })
}

/// Does this stat token ask for an event section (cards, substitutions,
/// goals) rather than a numeric category?
pub fn is_event_token(token: &str) -> bool {
    let t = token.to_lowercase();
    t.contains("card") || t.contains("yellow") || t.contains("red")
        || t.contains("sub") || t.contains("goal") || t.contains("assist")
}

fn event_matches_token(event: &MatchEvent, token: &str) -> bool {
    let t = token.to_lowercase();
    let detail = event.detail.to_lowercase();
    match event.kind.as_str() {
        "Card" => {
            if t.contains("yellow") {
                detail.contains("yellow")
            } else if t.contains("red") {
                detail.contains("red")
            } else {
                t.contains("card")
            }
        }
        "subst" => t.contains("sub"),
        "Goal" => t.contains("goal") || t.contains("assist"),
        _ => false,
    }
}

/// Keeps the events any requested token selects. An empty token list keeps
/// everything.
pub fn filter_events(events: &[MatchEvent], tokens: &[String]) -> Vec<MatchEvent> {
    let event_tokens: Vec<&String> = tokens.iter().filter(|t| is_event_token(t)).collect();
    if event_tokens.is_empty() {
        return events.to_vec();
    }
    events
        .iter()
        .filter(|event| event_tokens.iter().any(|t| event_matches_token(event, t)))
        .cloned()
        .collect()
}

/// Converts the fixture-statistics document, keeping only allow-listed
/// categories, then narrowing further to any requested numeric tokens.
pub fn convert_statistics(raw: &Value, tokens: &[String]) -> Vec<TeamStats> {
    let numeric_tokens: Vec<String> = tokens
        .iter()
        .filter(|t| !is_event_token(t))
        .map(|t| t.to_lowercase().replace('_', " "))
        .collect();

    let mut out = Vec::new();
    let Some(rows) = raw.get("response").and_then(|v| v.as_array()) else {
        return out;
    };
    for row in rows {
        let team = row
            .get("team")
            .and_then(|t| t.get("name"))
            .and_then(|x| x.as_str())
            .unwrap_or_default()
            .to_string();
        let mut stats = Vec::new();
        if let Some(items) = row.get("statistics").and_then(|v| v.as_array()) {
            for item in items {
                let Some(kind) = item.get("type").and_then(|x| x.as_str()) else {
                    continue;
                };
                if !STAT_ALLOW_LIST.contains(&kind) {
                    continue;
                }
                if !numeric_tokens.is_empty() {
                    let lowered = kind.to_lowercase();
                    if !numeric_tokens.iter().any(|t| lowered.contains(t.as_str())) {
                        continue;
                    }
                }
                let value = match item.get("value") {
                    Some(Value::Null) | None => "0".to_string(),
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                };
                stats.push((kind.to_string(), value));
            }
        }
        out.push(TeamStats { team, stats });
    }
    out
}
