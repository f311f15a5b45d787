use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::api_client::SportsApi;
use crate::error::ApiError;
use crate::standings::StandingRow;

/// Leagues the assistant answers for. Name resolution checks this table
/// before touching the remote search endpoint, so the common cases never
/// cost a request.
pub struct LeagueInfo {
    pub name: &'static str,
    pub id: u32,
    pub uefa: bool,
    pub aliases: &'static [&'static str],
}

pub const SUPPORTED_LEAGUES: &[LeagueInfo] = &[
    LeagueInfo {
        name: "Premier League",
        id: 39,
        uefa: false,
        aliases: &["premier league", "epl", "english premier league"],
    },
    LeagueInfo {
        name: "La Liga",
        id: 140,
        uefa: false,
        aliases: &["la liga", "laliga", "primera division"],
    },
    LeagueInfo {
        name: "Serie A",
        id: 135,
        uefa: false,
        aliases: &["serie a"],
    },
    LeagueInfo {
        name: "Bundesliga",
        id: 78,
        uefa: false,
        aliases: &["bundesliga"],
    },
    LeagueInfo {
        name: "Ligue 1",
        id: 61,
        uefa: false,
        aliases: &["ligue 1", "ligue un"],
    },
    LeagueInfo {
        name: "Champions League",
        id: 2,
        uefa: true,
        aliases: &["champions league", "ucl", "uefa champions league"],
    },
    LeagueInfo {
        name: "Europa League",
        id: 3,
        uefa: true,
        aliases: &["europa league", "uel", "uefa europa league"],
    },
    LeagueInfo {
        name: "Conference League",
        id: 848,
        uefa: true,
        aliases: &["conference league", "uecl", "europa conference league"],
    },
];

pub fn league_label(league_id: u32) -> String {
    SUPPORTED_LEAGUES
        .iter()
        .find(|league| league.id == league_id)
        .map(|league| league.name.to_string())
        .unwrap_or_else(|| format!("league {league_id}"))
}

pub fn is_uefa_league(league_id: u32) -> bool {
    SUPPORTED_LEAGUES
        .iter()
        .any(|league| league.id == league_id && league.uefa)
}

fn alias_lookup(name: &str) -> Option<u32> {
    let needle = name.trim().to_lowercase();
    SUPPORTED_LEAGUES.iter().find_map(|league| {
        let hit = league.name.eq_ignore_ascii_case(&needle)
            || league.aliases.iter().any(|alias| *alias == needle);
        hit.then_some(league.id)
    })
}

/// Embedded identity/standings store. Schema is created idempotently on
/// every open; a missing or wiped file just rebuilds empty.
pub struct IdentityStore {
    conn: Connection,
}

impl IdentityStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open identity store {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory identity store")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn lookup_team(&self, name: &str) -> Result<Option<u64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM team WHERE name = ?1 COLLATE NOCASE LIMIT 1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .context("team lookup")?;
        Ok(id)
    }

    /// First writer wins: a later insert under the same id (or a
    /// differently-cased duplicate of the same name) is ignored, never
    /// reconciled.
    pub fn insert_team(&self, id: u64, name: &str, country: Option<&str>) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO team(id, name, country) VALUES(?1, ?2, ?3)",
                params![id, name, country],
            )
            .context("team insert")?;
        Ok(())
    }

    pub fn lookup_player(&self, name: &str) -> Result<Option<u64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM player WHERE name = ?1 COLLATE NOCASE LIMIT 1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .context("player lookup")?;
        Ok(id)
    }

    pub fn insert_player(&self, id: u64, name: &str, common: Option<&str>) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO player(id, name, common) VALUES(?1, ?2, ?3)",
                params![id, name, common],
            )
            .context("player insert")?;
        Ok(())
    }

    pub fn cache_standings(&self, league_id: u32, season: &str, rows: &[StandingRow]) -> Result<()> {
        let json = serde_json::to_string(rows).context("serialize standings rows")?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO standings_cache(league, season, json) VALUES(?1, ?2, ?3)",
                params![league_id, season, json],
            )
            .context("standings upsert")?;
        Ok(())
    }

    pub fn load_standings_cache(
        &self,
        league_id: u32,
        season: &str,
    ) -> Result<Option<Vec<StandingRow>>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT json FROM standings_cache WHERE league = ?1 AND season = ?2",
                params![league_id, season],
                |row| row.get(0),
            )
            .optional()
            .context("standings lookup")?;
        let Some(json) = json else {
            return Ok(None);
        };
        // A stale blob from an older row shape is treated as a miss.
        Ok(serde_json::from_str(&json).ok())
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS team (
            id      INTEGER PRIMARY KEY,
            name    TEXT,
            country TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_team_name ON team(name COLLATE NOCASE);

        CREATE TABLE IF NOT EXISTS player (
            id      INTEGER PRIMARY KEY,
            name    TEXT,
            common  TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_player_name ON player(name COLLATE NOCASE);

        CREATE TABLE IF NOT EXISTS standings_cache (
            league INTEGER,
            season TEXT,
            json   TEXT,
            PRIMARY KEY (league, season)
        );
        "#,
    )
    .context("create identity store schema")?;
    Ok(())
}

/// Name-to-id resolution over the store with remote search fallback.
/// League lookups are memoized for the process lifetime; team and player
/// misses are deliberately not cached, so an identical later lookup retries
/// the search.
pub struct Resolver<'a> {
    store: &'a IdentityStore,
    api: &'a dyn SportsApi,
    league_memo: HashMap<String, Option<u32>>,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a IdentityStore, api: &'a dyn SportsApi) -> Self {
        Self {
            store,
            api,
            league_memo: HashMap::new(),
        }
    }

    pub fn league_name_to_id(&mut self, name: &str) -> Result<Option<u32>, ApiError> {
        if let Some(id) = alias_lookup(name) {
            return Ok(Some(id));
        }
        if let Some(memo) = self.league_memo.get(name) {
            return Ok(*memo);
        }
        let value = self.api.search_leagues(name)?;
        let id = value
            .get("response")
            .and_then(|v| v.as_array())
            .and_then(|rows| rows.first())
            .and_then(|row| row.get("league"))
            .and_then(|league| league.get("id"))
            .and_then(|id| id.as_u64())
            .map(|id| id as u32);
        debug!(name, ?id, "league search");
        self.league_memo.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn team_name_to_id(
        &mut self,
        name: &str,
        league_id: Option<u32>,
        season: Option<&str>,
    ) -> Result<Option<u64>, ApiError> {
        match self.store.lookup_team(name) {
            Ok(Some(id)) => return Ok(Some(id)),
            Ok(None) => {}
            Err(err) => warn!(name, %err, "team cache lookup failed"),
        }

        let value = self.api.search_teams(name, league_id, season)?;
        let Some(team) = value
            .get("response")
            .and_then(|v| v.as_array())
            .and_then(|rows| rows.first())
            .and_then(|row| row.get("team"))
        else {
            return Ok(None);
        };
        let Some(id) = team.get("id").and_then(|id| id.as_u64()) else {
            return Ok(None);
        };
        let canonical = team.get("name").and_then(|n| n.as_str()).unwrap_or(name);
        let country = team.get("country").and_then(|c| c.as_str());
        if let Err(err) = self.store.insert_team(id, canonical, country) {
            warn!(name, %err, "team cache insert failed");
        }
        debug!(name, id, canonical, "team resolved");
        Ok(Some(id))
    }

    pub fn player_name_to_id(
        &mut self,
        name: &str,
        league_id: Option<u32>,
        season: Option<&str>,
    ) -> Result<Option<u64>, ApiError> {
        match self.store.lookup_player(name) {
            Ok(Some(id)) => return Ok(Some(id)),
            Ok(None) => {}
            Err(err) => warn!(name, %err, "player cache lookup failed"),
        }

        let value = self.api.search_players(name, league_id, season)?;
        let Some(player) = value
            .get("response")
            .and_then(|v| v.as_array())
            .and_then(|rows| rows.first())
            .and_then(|row| row.get("player"))
        else {
            return Ok(None);
        };
        let Some(id) = player.get("id").and_then(|id| id.as_u64()) else {
            return Ok(None);
        };
        let canonical = player.get("name").and_then(|n| n.as_str()).unwrap_or(name);
        let common = player.get("firstname").and_then(|c| c.as_str());
        if let Err(err) = self.store.insert_player(id, canonical, common) {
            warn!(name, %err, "player cache insert failed");
        }
        debug!(name, id, canonical, "player resolved");
        Ok(Some(id))
    }

    /// Standings cache read. Store trouble is logged and treated as a miss;
    /// the dispatcher will refetch and re-cache.
    pub fn load_standings(&self, league_id: u32, season: &str) -> Option<Vec<StandingRow>> {
        match self.store.load_standings_cache(league_id, season) {
            Ok(rows) => rows,
            Err(err) => {
                warn!(league_id, season, %err, "standings cache read failed");
                None
            }
        }
    }

    pub fn cache_standings(&self, league_id: u32, season: &str, rows: &[StandingRow]) {
        if let Err(err) = self.store.cache_standings(league_id, season, rows) {
            warn!(league_id, season, %err, "standings cache write failed");
        }
    }
}
