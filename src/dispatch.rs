use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api_client::{FixtureQuery, SportsApi};
use crate::bracket::{derive_bracket, team_final_placement, Bracket};
use crate::error::ApiError;
use crate::events::{convert_events, convert_statistics, filter_events, is_event_token, MatchEvent, TeamStats};
use crate::fixtures::{convert_fixtures, locate_fixture, FixtureRow};
use crate::normalize::{deduce_season_from_date, normalize_season, standardize_date};
use crate::player_stats::{extract_player_stats, PlayerSeasonStats};
use crate::resolver::{is_uefa_league, league_label, IdentityStore, Resolver, SUPPORTED_LEAGUES};
use crate::standings::{classify_stage_tables, convert_standings, team_rank, StageTables, LEAGUE_PHASE_FROM};

/// Season assumed when neither a date nor a season was supplied.
pub const DEFAULT_SEASON: &str = "2025";

pub const MSG_COMING_SOON: &str =
    "That sport is on our roadmap, but right now football is all we cover. Check back soon!";
pub const MSG_OUT_OF_SCOPE: &str =
    "I can only help with football statistics questions.";
pub const MSG_DONT_UNDERSTAND: &str =
    "Sorry, I didn't understand that. Ask me about standings, fixtures, match events or player stats.";
pub const MSG_BAD_DATE: &str =
    "I couldn't read that date. Try a format like 2025-05-16 or 16/05/2025.";
pub const MSG_REMOTE_DOWN: &str =
    "The stats service is not responding right now. Please try again later.";
pub const MSG_RATE_LIMITED: &str =
    "We're sending requests too fast. Try again in a minute.";
pub const MSG_NO_RECORD: &str =
    "The stats service has no record of that.";
pub const MSG_BRACKET_UEFA_ONLY: &str =
    "Knockout brackets are only available for the UEFA club competitions.";
pub const MSG_NO_FIXTURES: &str = "I couldn't find any matching fixtures.";
pub const MSG_NO_STANDINGS: &str = "No standings are available for that league and season.";
pub const MSG_NO_BRACKET: &str = "No knockout bracket is available for that season.";
pub const MSG_NO_STATS: &str = "I couldn't find any stats for that player in that season.";
pub const MSG_NEED_TWO_TEAMS: &str =
    "Tell me both teams of the match you mean, e.g. 'Chelsea vs Arsenal'.";
pub const MSG_NEED_FIXTURE_CONTEXT: &str =
    "Tell me which team, match-up or league you mean.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Standings,
    Fixture,
    MatchEvents,
    PlayerStats,
    Bracket,
    #[default]
    Unsupported,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Football,
    Basketball,
    Rugby,
    F1,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureMode {
    Next,
    Last,
    Specific,
    Season,
    TeamNext,
    TeamLast,
}

/// Structured query as extracted upstream. A missing field is `None`,
/// never an empty string; the parser enforces that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub intent: Intent,
    pub sport: Sport,
    #[serde(default)]
    pub league_name: Option<String>,
    #[serde(default)]
    pub team_a: Option<String>,
    #[serde(default)]
    pub team_b: Option<String>,
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub stats: Vec<String>,
    #[serde(default)]
    pub fixture_mode: Option<FixtureMode>,
    #[serde(default)]
    pub count: Option<u32>,
}

impl ParsedQuery {
    /// The sentinel the parser returns when a prompt is rejected or cannot
    /// be extracted.
    pub fn unsupported() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClarifyNeed {
    League,
    LeagueForPlayer,
}

/// One stalled query waiting for a clarification answer. The slot is
/// consumed on the next turn; a second stall before then overwrites it.
#[derive(Debug, Clone)]
pub struct Pending {
    pub need: ClarifyNeed,
    pub parsed: ParsedQuery,
}

/// Per-conversation state. Holds nothing but the clarification slot, and
/// is passed by the caller into every turn so conversations never share it.
#[derive(Debug, Default)]
pub struct Session {
    pub pending: Option<Pending>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Resolved data handed to the rendering layer. Everything here is already
/// filtered; rendering performs no resolution of its own.
#[derive(Debug)]
pub enum Reply {
    Message(String),
    Standings {
        league: String,
        season: String,
        tables: StageTables,
    },
    TeamFinish {
        team: String,
        league: String,
        season: String,
        rank: u32,
        group: Option<String>,
    },
    Fixtures(Vec<FixtureRow>),
    Events {
        fixture: FixtureRow,
        events: Vec<MatchEvent>,
        stats: Vec<TeamStats>,
    },
    PlayerStats(PlayerSeasonStats),
    Bracket(Bracket),
}

pub fn clarify_league_prompt() -> String {
    let names: Vec<&str> = SUPPORTED_LEAGUES.iter().map(|league| league.name).collect();
    format!(
        "Which league do you mean? I currently cover: {}.",
        names.join(", ")
    )
}

pub fn clarify_league_for_player_prompt() -> String {
    let names: Vec<&str> = SUPPORTED_LEAGUES.iter().map(|league| league.name).collect();
    format!(
        "Which league should I look that player up in? I currently cover: {}.",
        names.join(", ")
    )
}

pub fn fetch_error_message(err: &ApiError) -> String {
    match err {
        ApiError::RemoteUnavailable(_) => MSG_REMOTE_DOWN.to_string(),
        ApiError::RateLimited => MSG_RATE_LIMITED.to_string(),
        ApiError::NotFound(_) => MSG_NO_RECORD.to_string(),
        ApiError::Upstream { .. } | ApiError::InvalidResponse(_) => MSG_REMOTE_DOWN.to_string(),
    }
}

/// The per-turn state machine. Owns name resolution (and with it the league
/// memo); the conversation's `Session` is passed into each turn.
pub struct Dispatcher<'a> {
    api: &'a dyn SportsApi,
    resolver: Resolver<'a>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(api: &'a dyn SportsApi, store: &'a IdentityStore) -> Self {
        Self {
            api,
            resolver: Resolver::new(store, api),
        }
    }

    /// One conversational turn. A pending clarification consumes the raw
    /// input as its answer when it resolves to a league; otherwise the turn
    /// is parsed fresh.
    pub fn handle_turn(
        &mut self,
        session: &mut Session,
        input: &str,
        parse: impl FnOnce(&str) -> ParsedQuery,
    ) -> Reply {
        if let Some(pending) = session.pending.take() {
            match self.resolver.league_name_to_id(input.trim()) {
                Ok(Some(_)) => {
                    debug!(need = ?pending.need, "clarification consumed");
                    let mut merged = pending.parsed;
                    merged.league_name = Some(input.trim().to_string());
                    return self.dispatch(session, merged);
                }
                Ok(None) => {
                    // Not a league answer; fall through and parse fresh.
                }
                Err(err) => {
                    session.pending = Some(pending);
                    return Reply::Message(fetch_error_message(&err));
                }
            }
        }
        let parsed = parse(input);
        self.dispatch(session, parsed)
    }

    /// Dispatch of an already-parsed query.
    pub fn dispatch(&mut self, session: &mut Session, parsed: ParsedQuery) -> Reply {
        match parsed.sport {
            Sport::Football => {}
            Sport::Basketball | Sport::Rugby | Sport::F1 => {
                return Reply::Message(MSG_COMING_SOON.to_string());
            }
            Sport::Other => return Reply::Message(MSG_OUT_OF_SCOPE.to_string()),
        }
        if parsed.intent == Intent::Unsupported {
            return Reply::Message(MSG_DONT_UNDERSTAND.to_string());
        }

        let league_id = match parsed.league_name.as_deref() {
            Some(name) => match self.resolver.league_name_to_id(name) {
                Ok(id) => id,
                Err(err) => return Reply::Message(fetch_error_message(&err)),
            },
            None => None,
        };

        // Stall for a league before touching dates or the remote fetcher.
        if league_id.is_none() {
            match parsed.intent {
                Intent::Standings | Intent::Bracket => {
                    session.pending = Some(Pending {
                        need: ClarifyNeed::League,
                        parsed: parsed.clone(),
                    });
                    return Reply::Message(clarify_league_prompt());
                }
                Intent::PlayerStats => {
                    session.pending = Some(Pending {
                        need: ClarifyNeed::LeagueForPlayer,
                        parsed: parsed.clone(),
                    });
                    return Reply::Message(clarify_league_for_player_prompt());
                }
                _ => {}
            }
        }

        let date = match parsed.date.as_deref() {
            Some(raw) => match standardize_date(raw) {
                Some(iso) => Some(iso),
                None => return Reply::Message(MSG_BAD_DATE.to_string()),
            },
            None => None,
        };

        let season = date
            .as_deref()
            .and_then(deduce_season_from_date)
            .or_else(|| parsed.season.as_deref().and_then(normalize_season))
            .unwrap_or_else(|| DEFAULT_SEASON.to_string());

        let result = match (parsed.intent, league_id) {
            (Intent::Standings, Some(league_id)) => {
                self.standings_branch(league_id, &season, &parsed)
            }
            (Intent::Fixture, league_id) => {
                self.fixture_branch(league_id, &season, date.as_deref(), &parsed)
            }
            (Intent::MatchEvents, league_id) => {
                self.events_branch(league_id, &season, date.as_deref(), &parsed)
            }
            (Intent::PlayerStats, Some(league_id)) => {
                self.player_branch(league_id, &season, &parsed)
            }
            (Intent::Bracket, Some(league_id)) => self.bracket_branch(league_id, &season),
            _ => Ok(Reply::Message(MSG_DONT_UNDERSTAND.to_string())),
        };
        match result {
            Ok(reply) => reply,
            Err(err) => Reply::Message(fetch_error_message(&err)),
        }
    }

    fn standings_branch(
        &mut self,
        league_id: u32,
        season: &str,
        parsed: &ParsedQuery,
    ) -> Result<Reply, ApiError> {
        let (tables, uefa) = if is_uefa_league(league_id) {
            let rows = convert_standings(&self.api.get_standings(league_id, season)?);
            (classify_stage_tables(rows, season), true)
        } else {
            let rows = match self.resolver.load_standings(league_id, season) {
                Some(rows) => rows,
                None => {
                    let rows = convert_standings(&self.api.get_standings(league_id, season)?);
                    if !rows.is_empty() {
                        self.resolver.cache_standings(league_id, season, &rows);
                    }
                    rows
                }
            };
            (StageTables::LeaguePhase(rows), false)
        };

        if let Some(team) = parsed.team_a.as_deref() {
            return self.team_finish(league_id, season, team, &tables, uefa);
        }
        if tables.is_empty() {
            return Ok(Reply::Message(MSG_NO_STANDINGS.to_string()));
        }
        Ok(Reply::Standings {
            league: league_label(league_id),
            season: season.to_string(),
            tables,
        })
    }

    fn team_finish(
        &mut self,
        league_id: u32,
        season: &str,
        team: &str,
        tables: &StageTables,
        uefa: bool,
    ) -> Result<Reply, ApiError> {
        let Some(team_id) = self
            .resolver
            .team_name_to_id(team, Some(league_id), Some(season))?
        else {
            return Ok(Reply::Message(format!(
                "I couldn't find a team called '{team}'."
            )));
        };

        // Knockout-era UEFA seasons: the group table only tells part of the
        // story, the bracket decides the final placement.
        let season_year: i32 = season.parse().unwrap_or(0);
        if uefa && season_year < LEAGUE_PHASE_FROM {
            let bracket = derive_bracket(self.api, league_id, season)?;
            if let Some(rank) = team_final_placement(&bracket, team_id) {
                return Ok(Reply::TeamFinish {
                    team: team.to_string(),
                    league: league_label(league_id),
                    season: season.to_string(),
                    rank,
                    group: None,
                });
            }
        }

        match team_rank(tables, team_id) {
            Some((rank, group)) => Ok(Reply::TeamFinish {
                team: team.to_string(),
                league: league_label(league_id),
                season: season.to_string(),
                rank,
                group,
            }),
            None => Ok(Reply::Message(format!(
                "{team} doesn't appear in that season's table."
            ))),
        }
    }

    fn fixture_branch(
        &mut self,
        league_id: Option<u32>,
        season: &str,
        date: Option<&str>,
        parsed: &ParsedQuery,
    ) -> Result<Reply, ApiError> {
        let a_id = match parsed.team_a.as_deref() {
            Some(name) => {
                let Some(id) = self.resolver.team_name_to_id(name, league_id, Some(season))? else {
                    return Ok(Reply::Message(format!(
                        "I couldn't find a team called '{name}'."
                    )));
                };
                Some(id)
            }
            None => None,
        };
        let b_id = match parsed.team_b.as_deref() {
            Some(name) => {
                let Some(id) = self.resolver.team_name_to_id(name, league_id, Some(season))? else {
                    return Ok(Reply::Message(format!(
                        "I couldn't find a team called '{name}'."
                    )));
                };
                Some(id)
            }
            None => None,
        };

        let mut mode = parsed.fixture_mode.unwrap_or(if date.is_some() {
            FixtureMode::Specific
        } else {
            FixtureMode::Last
        });
        // A lone team has no head-to-head; route through the team listing.
        if a_id.is_some() != b_id.is_some() {
            mode = match mode {
                FixtureMode::Next | FixtureMode::TeamNext => FixtureMode::TeamNext,
                _ => FixtureMode::TeamLast,
            };
        }

        let mut league_id = league_id;
        if league_id.is_none() {
            if let (Some(a), Some(b)) = (a_id, b_id) {
                league_id = self.api.infer_league_from_h2h(a, b)?;
                debug!(?league_id, "league inferred from head-to-head");
            }
        }

        if a_id.is_none() && b_id.is_none() && league_id.is_none() && date.is_none() {
            return Ok(Reply::Message(MSG_NEED_FIXTURE_CONTEXT.to_string()));
        }

        let count = parsed.count.unwrap_or(1);
        let h2h = match (a_id, b_id) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        };
        let mut query = match mode {
            FixtureMode::TeamNext => FixtureQuery {
                team_id: a_id.or(b_id),
                next: Some(count),
                ..FixtureQuery::default()
            },
            FixtureMode::TeamLast => FixtureQuery {
                team_id: a_id.or(b_id),
                last: Some(count),
                ..FixtureQuery::default()
            },
            FixtureMode::Next => FixtureQuery {
                h2h,
                league_id,
                next: Some(count),
                ..FixtureQuery::default()
            },
            FixtureMode::Last => FixtureQuery {
                h2h,
                league_id,
                last: Some(count),
                ..FixtureQuery::default()
            },
            FixtureMode::Specific => FixtureQuery {
                h2h,
                league_id,
                date: h2h.is_none().then(|| date.map(|d| d.to_string())).flatten(),
                ..FixtureQuery::default()
            },
            FixtureMode::Season => FixtureQuery {
                h2h,
                league_id,
                season: Some(season.to_string()),
                ..FixtureQuery::default()
            },
        };

        query.stage = parsed.stage.clone();

        let mut rows = convert_fixtures(&self.api.get_fixtures(&query)?);
        // Head-to-head listings come unfiltered; narrow to the asked day.
        if mode == FixtureMode::Specific && h2h.is_some() {
            if let Some(date) = date {
                rows.retain(|row| row.day() == date);
            }
        }
        if rows.is_empty() {
            return Ok(Reply::Message(MSG_NO_FIXTURES.to_string()));
        }
        Ok(Reply::Fixtures(rows))
    }

    fn events_branch(
        &mut self,
        league_id: Option<u32>,
        season: &str,
        date: Option<&str>,
        parsed: &ParsedQuery,
    ) -> Result<Reply, ApiError> {
        let (Some(a_name), Some(b_name)) = (parsed.team_a.as_deref(), parsed.team_b.as_deref())
        else {
            return Ok(Reply::Message(MSG_NEED_TWO_TEAMS.to_string()));
        };
        let Some(a_id) = self
            .resolver
            .team_name_to_id(a_name, league_id, Some(season))?
        else {
            return Ok(Reply::Message(format!(
                "I couldn't find a team called '{a_name}'."
            )));
        };
        let Some(b_id) = self
            .resolver
            .team_name_to_id(b_name, league_id, Some(season))?
        else {
            return Ok(Reply::Message(format!(
                "I couldn't find a team called '{b_name}'."
            )));
        };

        let query = FixtureQuery {
            h2h: Some((a_id, b_id)),
            ..FixtureQuery::default()
        };
        let rows = convert_fixtures(&self.api.get_fixtures(&query)?);
        let Some(fixture) = locate_fixture(&rows, date) else {
            return Ok(Reply::Message(MSG_NO_FIXTURES.to_string()));
        };

        let wants_events =
            parsed.stats.is_empty() || parsed.stats.iter().any(|t| is_event_token(t));
        let wants_stats =
            parsed.stats.is_empty() || parsed.stats.iter().any(|t| !is_event_token(t));

        let events = if wants_events {
            filter_events(
                &convert_events(&self.api.get_match_events(fixture.id)?),
                &parsed.stats,
            )
        } else {
            Vec::new()
        };
        let stats = if wants_stats {
            convert_statistics(
                &self.api.get_fixture_statistics(fixture.id)?,
                &parsed.stats,
            )
        } else {
            Vec::new()
        };

        Ok(Reply::Events {
            fixture,
            events,
            stats,
        })
    }

    fn player_branch(
        &mut self,
        league_id: u32,
        season: &str,
        parsed: &ParsedQuery,
    ) -> Result<Reply, ApiError> {
        let Some(name) = parsed.player_name.as_deref() else {
            return Ok(Reply::Message(MSG_DONT_UNDERSTAND.to_string()));
        };
        let Some(player_id) = self
            .resolver
            .player_name_to_id(name, Some(league_id), Some(season))?
        else {
            return Ok(Reply::Message(format!(
                "I couldn't find a player called '{name}'."
            )));
        };

        let raw = self.api.get_player_stats(player_id, season, Some(league_id))?;
        match extract_player_stats(&raw, season, &parsed.stats) {
            Some(stats) if !stats.items.is_empty() => Ok(Reply::PlayerStats(stats)),
            _ => Ok(Reply::Message(MSG_NO_STATS.to_string())),
        }
    }

    fn bracket_branch(&mut self, league_id: u32, season: &str) -> Result<Reply, ApiError> {
        // Domestic leagues have no knockout bracket; never ask the provider.
        if !is_uefa_league(league_id) {
            return Ok(Reply::Message(MSG_BRACKET_UEFA_ONLY.to_string()));
        }
        let bracket = derive_bracket(self.api, league_id, season)?;
        if bracket.is_empty() {
            return Ok(Reply::Message(MSG_NO_BRACKET.to_string()));
        }
        Ok(Reply::Bracket(bracket))
    }
}
