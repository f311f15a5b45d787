use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::ApiError;

const BASE_URL: &str = "https://v3.football.api-sports.io";
const API_KEY_HEADER: &str = "x-apisports-key";
const RESPONSE_CACHE_CAP: usize = 256;

/// Fixture listing filters. `fixture_id` preempts everything else; a set
/// `h2h` pair routes the call to the head-to-head endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureQuery {
    pub league_id: Option<u32>,
    pub season: Option<String>,
    pub date: Option<String>,
    pub h2h: Option<(u64, u64)>,
    pub fixture_id: Option<u64>,
    pub stage: Option<String>,
    pub last: Option<u32>,
    pub next: Option<u32>,
    pub team_id: Option<u64>,
}

/// The remote stats provider as the dispatcher sees it. Every call blocks,
/// returns the raw provider `{response: [...]}` document, and fails only
/// with a categorized [`ApiError`].
pub trait SportsApi {
    fn get_standings(&self, league_id: u32, season: &str) -> Result<Value, ApiError>;
    fn get_fixtures(&self, query: &FixtureQuery) -> Result<Value, ApiError>;
    fn get_match_events(&self, fixture_id: u64) -> Result<Value, ApiError>;
    fn get_fixture_statistics(&self, fixture_id: u64) -> Result<Value, ApiError>;
    fn get_player_stats(
        &self,
        player_id: u64,
        season: &str,
        league_id: Option<u32>,
    ) -> Result<Value, ApiError>;
    fn get_stage_names(&self, league_id: u32, season: &str) -> Result<Vec<String>, ApiError>;
    fn search_leagues(&self, name: &str) -> Result<Value, ApiError>;
    fn search_teams(
        &self,
        name: &str,
        league_id: Option<u32>,
        season: Option<&str>,
    ) -> Result<Value, ApiError>;
    fn search_players(
        &self,
        name: &str,
        league_id: Option<u32>,
        season: Option<&str>,
    ) -> Result<Value, ApiError>;
    fn infer_league_from_h2h(&self, team_a_id: u64, team_b_id: u64)
        -> Result<Option<u32>, ApiError>;
}

/// Blocking API-Football v3 client with a bounded in-memory response cache.
///
/// The cache is keyed on endpoint + query string and evicts oldest-first.
/// It only short-circuits repeated identical requests within one process;
/// callers observe the same results with or without it.
pub struct ApiClient {
    client: Client,
    key: String,
    cache: Mutex<ResponseCache>,
}

#[derive(Default)]
struct ResponseCache {
    entries: HashMap<String, Value>,
    order: VecDeque<String>,
}

impl ResponseCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: String, value: Value) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key, value);
            return;
        }
        while self.entries.len() >= RESPONSE_CACHE_CAP {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ApiError::RemoteUnavailable(err.to_string()))?;
        Ok(Self {
            client,
            key: config.football_key.clone(),
            cache: Mutex::new(ResponseCache::default()),
        })
    }

    fn call(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, ApiError> {
        let cache_key = request_key(endpoint, params);
        if let Ok(cache) = self.cache.lock() {
            if let Some(hit) = cache.get(&cache_key) {
                debug!(endpoint, "provider cache hit");
                return Ok(hit);
            }
        }

        debug!(endpoint, ?params, "provider request");
        let resp = self
            .client
            .get(format!("{BASE_URL}/{endpoint}"))
            .header(API_KEY_HEADER, &self.key)
            .query(params)
            .send()
            .map_err(|err| ApiError::RemoteUnavailable(err.to_string()))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(endpoint.to_string()));
        }
        let body = resp
            .text()
            .map_err(|err| ApiError::RemoteUnavailable(err.to_string()))?;
        if !status.is_success() {
            return Err(ApiError::Upstream {
                status: status.as_u16(),
                detail: truncate(&body, 200),
            });
        }

        let value: Value = serde_json::from_str(body.trim())
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))?;
        // API-Football reports quota exhaustion inside a 200 body.
        if let Some(kind) = embedded_error(&value) {
            return Err(kind);
        }

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(cache_key, value.clone());
        }
        Ok(value)
    }
}

fn request_key(endpoint: &str, params: &[(&str, String)]) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by_key(|(name, _)| *name);
    let mut key = endpoint.to_string();
    for (name, value) in sorted {
        key.push('&');
        key.push_str(name);
        key.push('=');
        key.push_str(value);
    }
    key
}

fn embedded_error(value: &Value) -> Option<ApiError> {
    let errors = value.get("errors")?.as_object()?;
    if errors.is_empty() {
        return None;
    }
    let (field, detail) = errors.iter().next()?;
    let detail = detail.as_str().unwrap_or_default().to_string();
    if field.to_ascii_lowercase().contains("rate") || field == "requests" {
        Some(ApiError::RateLimited)
    } else {
        warn!(%field, %detail, "provider rejected request");
        Some(ApiError::Upstream { status: 200, detail })
    }
}

fn truncate(body: &str, max: usize) -> String {
    let mut out: String = body.chars().take(max).collect();
    if body.chars().count() > max {
        out.push('…');
    }
    out
}

impl SportsApi for ApiClient {
    fn get_standings(&self, league_id: u32, season: &str) -> Result<Value, ApiError> {
        self.call(
            "standings",
            &[
                ("league", league_id.to_string()),
                ("season", season.to_string()),
            ],
        )
    }

    fn get_fixtures(&self, query: &FixtureQuery) -> Result<Value, ApiError> {
        // A concrete fixture id ignores every other filter.
        if let Some(fixture_id) = query.fixture_id {
            return self.call("fixtures", &[("id", fixture_id.to_string())]);
        }

        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(league_id) = query.league_id {
            params.push(("league", league_id.to_string()));
        }
        if let Some(season) = query.season.as_deref() {
            params.push(("season", season.to_string()));
        }
        if let Some(date) = query.date.as_deref() {
            params.push(("date", date.to_string()));
        }
        if let Some(stage) = query.stage.as_deref() {
            params.push(("round", stage.to_string()));
        }
        if let Some(team_id) = query.team_id {
            params.push(("team", team_id.to_string()));
        }
        if let Some(last) = query.last {
            params.push(("last", last.to_string()));
        }
        if let Some(next) = query.next {
            params.push(("next", next.to_string()));
        }

        if let Some((team_a, team_b)) = query.h2h {
            params.push(("h2h", format!("{team_a}-{team_b}")));
            return self.call("fixtures/headtohead", &params);
        }
        self.call("fixtures", &params)
    }

    fn get_match_events(&self, fixture_id: u64) -> Result<Value, ApiError> {
        self.call("fixtures/events", &[("fixture", fixture_id.to_string())])
    }

    fn get_fixture_statistics(&self, fixture_id: u64) -> Result<Value, ApiError> {
        self.call("fixtures/statistics", &[("fixture", fixture_id.to_string())])
    }

    fn get_player_stats(
        &self,
        player_id: u64,
        season: &str,
        league_id: Option<u32>,
    ) -> Result<Value, ApiError> {
        let mut params = vec![
            ("id", player_id.to_string()),
            ("season", season.to_string()),
        ];
        if let Some(league_id) = league_id {
            params.push(("league", league_id.to_string()));
        }
        self.call("players", &params)
    }

    fn get_stage_names(&self, league_id: u32, season: &str) -> Result<Vec<String>, ApiError> {
        let value = self.call(
            "fixtures/rounds",
            &[
                ("league", league_id.to_string()),
                ("season", season.to_string()),
            ],
        )?;
        let names = value
            .get("response")
            .and_then(|v| v.as_array())
            .map(|rounds| {
                rounds
                    .iter()
                    .filter_map(|round| round.as_str())
                    .map(|round| round.to_string())
                    .collect()
            })
            .unwrap_or_default();
        Ok(names)
    }

    fn search_leagues(&self, name: &str) -> Result<Value, ApiError> {
        self.call("leagues", &[("search", name.to_string())])
    }

    fn search_teams(
        &self,
        name: &str,
        league_id: Option<u32>,
        season: Option<&str>,
    ) -> Result<Value, ApiError> {
        let mut params = vec![("search", name.to_string())];
        if let Some(league_id) = league_id {
            params.push(("league", league_id.to_string()));
        }
        if let Some(season) = season {
            params.push(("season", season.to_string()));
        }
        self.call("teams", &params)
    }

    fn search_players(
        &self,
        name: &str,
        league_id: Option<u32>,
        season: Option<&str>,
    ) -> Result<Value, ApiError> {
        let mut params = vec![("search", name.to_string())];
        if let Some(league_id) = league_id {
            params.push(("league", league_id.to_string()));
        }
        if let Some(season) = season {
            params.push(("season", season.to_string()));
        }
        self.call("players", &params)
    }

    fn infer_league_from_h2h(
        &self,
        team_a_id: u64,
        team_b_id: u64,
    ) -> Result<Option<u32>, ApiError> {
        let query = FixtureQuery {
            h2h: Some((team_a_id, team_b_id)),
            last: Some(1),
            ..FixtureQuery::default()
        };
        let value = self.get_fixtures(&query)?;
        let league_id = value
            .get("response")
            .and_then(|v| v.as_array())
            .and_then(|rows| rows.first())
            .and_then(|row| row.get("league"))
            .and_then(|league| league.get("id"))
            .and_then(|id| id.as_u64())
            .map(|id| id as u32);
        Ok(league_id)
    }
}
