#![allow(dead_code)]

use std::cell::RefCell;

use serde_json::{json, Value};

use footy_terminal::api_client::{FixtureQuery, SportsApi};
use footy_terminal::error::ApiError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fail {
    None,
    RateLimited,
    Remote,
}

/// Scripted stand-in for the remote provider. Every call is recorded so
/// tests can assert what was (or was not) fetched.
pub struct ScriptedApi {
    pub calls: RefCell<Vec<String>>,
    pub last_fixture_query: RefCell<Option<FixtureQuery>>,
    pub standings: Value,
    pub fixtures: Value,
    pub events: Value,
    pub statistics: Value,
    pub player_stats: Value,
    pub stage_names: Vec<String>,
    pub stage_fixtures: Vec<(String, Value)>,
    pub leagues: Value,
    pub teams: Value,
    pub players: Value,
    pub h2h_league: Option<u32>,
    pub fail: Fail,
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            last_fixture_query: RefCell::new(None),
            standings: empty_doc(),
            fixtures: empty_doc(),
            events: empty_doc(),
            statistics: empty_doc(),
            player_stats: empty_doc(),
            stage_names: Vec::new(),
            stage_fixtures: Vec::new(),
            leagues: empty_doc(),
            teams: empty_doc(),
            players: empty_doc(),
            h2h_league: None,
            fail: Fail::None,
        }
    }
}

impl ScriptedApi {
    pub fn count(&self, endpoint: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.starts_with(endpoint))
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.borrow().len()
    }

    fn record(&self, call: String) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(call);
        match self.fail {
            Fail::None => Ok(()),
            Fail::RateLimited => Err(ApiError::RateLimited),
            Fail::Remote => Err(ApiError::RemoteUnavailable("scripted outage".to_string())),
        }
    }
}

impl SportsApi for ScriptedApi {
    fn get_standings(&self, league_id: u32, season: &str) -> Result<Value, ApiError> {
        self.record(format!("standings:{league_id}:{season}"))?;
        Ok(self.standings.clone())
    }

    fn get_fixtures(&self, query: &FixtureQuery) -> Result<Value, ApiError> {
        self.record("fixtures".to_string())?;
        *self.last_fixture_query.borrow_mut() = Some(query.clone());
        if let Some(stage) = query.stage.as_deref() {
            if let Some((_, doc)) = self.stage_fixtures.iter().find(|(name, _)| name == stage) {
                return Ok(doc.clone());
            }
        }
        Ok(self.fixtures.clone())
    }

    fn get_match_events(&self, fixture_id: u64) -> Result<Value, ApiError> {
        self.record(format!("events:{fixture_id}"))?;
        Ok(self.events.clone())
    }

    fn get_fixture_statistics(&self, fixture_id: u64) -> Result<Value, ApiError> {
        self.record(format!("statistics:{fixture_id}"))?;
        Ok(self.statistics.clone())
    }

    fn get_player_stats(
        &self,
        player_id: u64,
        season: &str,
        _league_id: Option<u32>,
    ) -> Result<Value, ApiError> {
        self.record(format!("player_stats:{player_id}:{season}"))?;
        Ok(self.player_stats.clone())
    }

    fn get_stage_names(&self, league_id: u32, season: &str) -> Result<Vec<String>, ApiError> {
        self.record(format!("stages:{league_id}:{season}"))?;
        Ok(self.stage_names.clone())
    }

    fn search_leagues(&self, name: &str) -> Result<Value, ApiError> {
        self.record(format!("search_leagues:{name}"))?;
        Ok(self.leagues.clone())
    }

    fn search_teams(
        &self,
        name: &str,
        _league_id: Option<u32>,
        _season: Option<&str>,
    ) -> Result<Value, ApiError> {
        self.record(format!("search_teams:{name}"))?;
        Ok(self.teams.clone())
    }

    fn search_players(
        &self,
        name: &str,
        _league_id: Option<u32>,
        _season: Option<&str>,
    ) -> Result<Value, ApiError> {
        self.record(format!("search_players:{name}"))?;
        Ok(self.players.clone())
    }

    fn infer_league_from_h2h(
        &self,
        team_a_id: u64,
        team_b_id: u64,
    ) -> Result<Option<u32>, ApiError> {
        self.record(format!("h2h_infer:{team_a_id}:{team_b_id}"))?;
        Ok(self.h2h_league)
    }
}

pub fn empty_doc() -> Value {
    json!({"response": []})
}

pub fn teams_doc(id: u64, name: &str) -> Value {
    json!({"response": [{"team": {"id": id, "name": name, "country": "England"}}]})
}

pub fn players_doc(id: u64, name: &str, firstname: &str) -> Value {
    json!({"response": [{"player": {"id": id, "name": name, "firstname": firstname}}]})
}

pub fn leagues_doc(id: u32, name: &str) -> Value {
    json!({"response": [{"league": {"id": id, "name": name}}]})
}

pub fn standing_entry(rank: u32, team_id: u64, team: &str, group: Option<&str>) -> Value {
    json!({
        "rank": rank,
        "team": {"id": team_id, "name": team},
        "points": 10,
        "goalsDiff": 3,
        "group": group,
        "all": {
            "played": 6, "win": 3, "draw": 1, "lose": 2,
            "goals": {"for": 9, "against": 6}
        }
    })
}

pub fn standings_doc(league_id: u32, tables: Vec<Vec<Value>>) -> Value {
    json!({
        "response": [{
            "league": {"id": league_id, "standings": tables}
        }]
    })
}

pub fn fixture_entry(
    id: u64,
    date: &str,
    home: (u64, &str),
    away: (u64, &str),
    goals: Option<(i64, i64)>,
    home_winner: Option<bool>,
) -> Value {
    let status = if goals.is_some() { "FT" } else { "NS" };
    json!({
        "fixture": {"id": id, "date": date, "status": {"short": status}},
        "league": {"id": 39, "name": "Premier League", "round": "Regular Season - 1"},
        "teams": {
            "home": {"id": home.0, "name": home.1, "winner": home_winner},
            "away": {"id": away.0, "name": away.1, "winner": home_winner.map(|w| !w)}
        },
        "goals": {"home": goals.map(|g| g.0), "away": goals.map(|g| g.1)}
    })
}

pub fn fixtures_doc(entries: Vec<Value>) -> Value {
    json!({"response": entries})
}
