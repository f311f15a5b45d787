use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Seasons from this starting year use the single-table league phase for
/// UEFA club competitions; earlier seasons ran the 8-group format.
pub const LEAGUE_PHASE_FROM: i32 = 2024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    pub rank: u32,
    pub team_id: u64,
    pub team: String,
    pub played: u32,
    pub win: u32,
    pub draw: u32,
    pub lose: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub gd: i64,
    pub pts: i64,
    pub group: Option<String>,
}

/// Standings resolved to a displayable shape: one round-robin table, or the
/// pre-2024 UEFA group tables keyed by their group label.
#[derive(Debug, Clone, PartialEq)]
pub enum StageTables {
    LeaguePhase(Vec<StandingRow>),
    Groups(Vec<(String, Vec<StandingRow>)>),
}

impl StageTables {
    pub fn is_empty(&self) -> bool {
        match self {
            StageTables::LeaguePhase(rows) => rows.is_empty(),
            StageTables::Groups(groups) => groups.is_empty(),
        }
    }
}

/// Flattens the provider standings document into rows. The provider nests
/// tables as `response[0].league.standings[group][row]`.
pub fn convert_standings(raw: &Value) -> Vec<StandingRow> {
    let mut out = Vec::new();
    let Some(tables) = raw
        .get("response")
        .and_then(|v| v.as_array())
        .and_then(|rows| rows.first())
        .and_then(|entry| entry.get("league"))
        .and_then(|league| league.get("standings"))
        .and_then(|v| v.as_array())
    else {
        return out;
    };

    for table in tables {
        let Some(rows) = table.as_array() else {
            continue;
        };
        for row in rows {
            if let Some(converted) = parse_standing_row(row) {
                out.push(converted);
            }
        }
    }
    out
}

fn parse_standing_row(v: &Value) -> Option<StandingRow> {
    let team = v.get("team")?;
    let all = v.get("all")?;
    let goals = all.get("goals").unwrap_or(&Value::Null);
    Some(StandingRow {
        rank: v.get("rank")?.as_u64()? as u32,
        team_id: team.get("id")?.as_u64()?,
        team: team.get("name")?.as_str()?.to_string(),
        played: all.get("played").and_then(|x| x.as_u64()).unwrap_or(0) as u32,
        win: all.get("win").and_then(|x| x.as_u64()).unwrap_or(0) as u32,
        draw: all.get("draw").and_then(|x| x.as_u64()).unwrap_or(0) as u32,
        lose: all.get("lose").and_then(|x| x.as_u64()).unwrap_or(0) as u32,
        goals_for: goals.get("for").and_then(|x| x.as_u64()).unwrap_or(0) as u32,
        goals_against: goals.get("against").and_then(|x| x.as_u64()).unwrap_or(0) as u32,
        gd: v.get("goalsDiff").and_then(|x| x.as_i64()).unwrap_or(0),
        pts: v.get("points").and_then(|x| x.as_i64()).unwrap_or(0),
        group: v
            .get("group")
            .and_then(|x| x.as_str())
            .map(|s| s.to_string()),
    })
}

/// Classifies a UEFA stage table by season: league phase from 2024 onward,
/// otherwise rows are bucketed by their declared group label in first-seen
/// order.
pub fn classify_stage_tables(rows: Vec<StandingRow>, season: &str) -> StageTables {
    let season_year: i32 = season.parse().unwrap_or(0);
    if season_year >= LEAGUE_PHASE_FROM {
        return StageTables::LeaguePhase(rows);
    }

    let mut groups: Vec<(String, Vec<StandingRow>)> = Vec::new();
    for row in rows {
        let label = row.group.clone().unwrap_or_else(|| "Group".to_string());
        match groups.iter_mut().find(|(name, _)| *name == label) {
            Some((_, members)) => members.push(row),
            None => groups.push((label, vec![row])),
        }
    }
    StageTables::Groups(groups)
}

/// Finds a team's rank within the resolved table(s). Group results carry
/// the group label so the caller can say "2nd in Group C".
pub fn team_rank(tables: &StageTables, team_id: u64) -> Option<(u32, Option<String>)> {
    match tables {
        StageTables::LeaguePhase(rows) => rows
            .iter()
            .find(|row| row.team_id == team_id)
            .map(|row| (row.rank, None)),
        StageTables::Groups(groups) => groups.iter().find_map(|(label, rows)| {
            rows.iter()
                .find(|row| row.team_id == team_id)
                .map(|row| (row.rank, Some(label.clone())))
        }),
    }
}
