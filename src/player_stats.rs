use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeasonStats {
    pub player: String,
    pub team: Option<String>,
    pub league: Option<String>,
    pub season: String,
    pub items: Vec<(String, String)>,
}

/// Pulls the first statistics block out of a player payload and flattens it
/// to labeled items, narrowed to any requested stat tokens. `None` means
/// the player has no statistics for that season.
pub fn extract_player_stats(
    raw: &Value,
    season: &str,
    tokens: &[String],
) -> Option<PlayerSeasonStats> {
    let entry = raw
        .get("response")
        .and_then(|v| v.as_array())
        .and_then(|rows| rows.first())?;
    let player = entry
        .get("player")
        .and_then(|p| p.get("name"))
        .and_then(|x| x.as_str())?
        .to_string();
    let stats = entry
        .get("statistics")
        .and_then(|v| v.as_array())
        .and_then(|blocks| blocks.first())?;

    let games = stats.get("games").unwrap_or(&Value::Null);
    let shots = stats.get("shots").unwrap_or(&Value::Null);
    let goals = stats.get("goals").unwrap_or(&Value::Null);
    let passes = stats.get("passes").unwrap_or(&Value::Null);
    let cards = stats.get("cards").unwrap_or(&Value::Null);

    // Provider spells it "appearences".
    let mut items: Vec<(String, String)> = Vec::new();
    push_num(&mut items, "Appearances", games.get("appearences"));
    push_num(&mut items, "Minutes", games.get("minutes"));
    push_num(&mut items, "Goals", goals.get("total"));
    push_num(&mut items, "Assists", goals.get("assists"));
    push_num(&mut items, "Shots", shots.get("total"));
    push_num(&mut items, "Shots on Target", shots.get("on"));
    push_num(&mut items, "Passes", passes.get("total"));
    push_num(&mut items, "Key Passes", passes.get("key"));
    push_num(&mut items, "Yellow Cards", cards.get("yellow"));
    push_num(&mut items, "Red Cards", cards.get("red"));
    if let Some(rating) = games.get("rating").and_then(|x| x.as_str()) {
        items.push(("Rating".to_string(), rating.to_string()));
    }

    if !tokens.is_empty() {
        let wanted: Vec<String> = tokens
            .iter()
            .map(|t| t.to_lowercase().replace('_', " "))
            .collect();
        items.retain(|(label, _)| {
            let lowered = label.to_lowercase();
            wanted.iter().any(|t| lowered.contains(t.as_str()))
        });
    }

    Some(PlayerSeasonStats {
        player,
        team: stats
            .get("team")
            .and_then(|t| t.get("name"))
            .and_then(|x| x.as_str())
            .map(|s| s.to_string()),
        league: stats
            .get("league")
            .and_then(|l| l.get("name"))
            .and_then(|x| x.as_str())
            .map(|s| s.to_string()),
        season: season.to_string(),
        items,
    })
}

fn push_num(items: &mut Vec<(String, String)>, label: &str, value: Option<&Value>) {
    // Null totals mean zero in this provider's payloads.
    let n = value.and_then(|x| x.as_i64()).unwrap_or(0);
    items.push((label.to_string(), n.to_string()));
}
