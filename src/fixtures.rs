use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRow {
    pub id: u64,
    pub date: String,
    pub league_id: u32,
    pub league: String,
    pub round: Option<String>,
    pub home_id: u64,
    pub home: String,
    pub away_id: u64,
    pub away: String,
    pub home_goals: Option<i64>,
    pub away_goals: Option<i64>,
    pub status: String,
    pub home_winner: Option<bool>,
    pub away_winner: Option<bool>,
}

impl FixtureRow {
    pub fn is_finished(&self) -> bool {
        matches!(self.status.as_str(), "FT" | "AET" | "PEN" | "AWD" | "WO")
    }

    /// Kickoff calendar date, for matching against a standardized query date.
    pub fn day(&self) -> &str {
        self.date.split('T').next().unwrap_or(&self.date)
    }

    pub fn winner_id(&self) -> Option<u64> {
        if self.home_winner == Some(true) {
            Some(self.home_id)
        } else if self.away_winner == Some(true) {
            Some(self.away_id)
        } else {
            None
        }
    }

    pub fn loser(&self) -> Option<(u64, &str)> {
        if self.home_winner == Some(true) {
            Some((self.away_id, &self.away))
        } else if self.away_winner == Some(true) {
            Some((self.home_id, &self.home))
        } else {
            None
        }
    }
}

/// Converts a provider fixtures document into rows, provider order kept.
pub fn convert_fixtures(raw: &Value) -> Vec<FixtureRow> {
    let mut out = Vec::new();
    let Some(rows) = raw.get("response").and_then(|v| v.as_array()) else {
        return out;
    };
    for row in rows {
        if let Some(converted) = parse_fixture_row(row) {
            out.push(converted);
        }
    }
    out
}

fn parse_fixture_row(v: &Value) -> Option<FixtureRow> {
    let fixture = v.get("fixture")?;
    let league = v.get("league").unwrap_or(&Value::Null);
    let teams = v.get("teams")?;
    let home = teams.get("home")?;
    let away = teams.get("away")?;
    let goals = v.get("goals").unwrap_or(&Value::Null);

    Some(FixtureRow {
        id: fixture.get("id")?.as_u64()?,
        date: fixture
            .get("date")
            .and_then(|x| x.as_str())
            .unwrap_or_default()
            .to_string(),
        league_id: league.get("id").and_then(|x| x.as_u64()).unwrap_or(0) as u32,
        league: league
            .get("name")
            .and_then(|x| x.as_str())
            .unwrap_or_default()
            .to_string(),
        round: league
            .get("round")
            .and_then(|x| x.as_str())
            .map(|s| s.to_string()),
        home_id: home.get("id")?.as_u64()?,
        home: home.get("name")?.as_str()?.to_string(),
        away_id: away.get("id")?.as_u64()?,
        away: away.get("name")?.as_str()?.to_string(),
        home_goals: goals.get("home").and_then(|x| x.as_i64()),
        away_goals: goals.get("away").and_then(|x| x.as_i64()),
        status: fixture
            .get("status")
            .and_then(|s| s.get("short"))
            .and_then(|x| x.as_str())
            .unwrap_or_default()
            .to_string(),
        home_winner: home.get("winner").and_then(|x| x.as_bool()),
        away_winner: away.get("winner").and_then(|x| x.as_bool()),
    })
}

/// Picks the single fixture a match-events query is about: the one played on
/// `date` when a date was given, otherwise the most recent one already
/// played (falling back to the first listed).
pub fn locate_fixture(rows: &[FixtureRow], date: Option<&str>) -> Option<FixtureRow> {
    if let Some(date) = date {
        return rows.iter().find(|row| row.day() == date).cloned();
    }
    let mut played: Vec<&FixtureRow> = rows.iter().filter(|row| row.is_finished()).collect();
    played.sort_by(|a, b| a.date.cmp(&b.date));
    played.last().copied().cloned().or_else(|| rows.first().cloned())
}
