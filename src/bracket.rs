use tracing::debug;

use crate::api_client::{FixtureQuery, SportsApi};
use crate::error::ApiError;
use crate::fixtures::{convert_fixtures, FixtureRow};

const FINAL_STAGE: &str = "Final";
const SEMI_FINAL_STAGE: &str = "Semi-finals";
const QUARTER_FINAL_STAGE: &str = "Quarter-finals";

/// Knockout-stage fixtures in provider stage order.
#[derive(Debug, Clone, PartialEq)]
pub struct Bracket {
    pub stages: Vec<(String, Vec<FixtureRow>)>,
}

impl Bracket {
    pub fn is_empty(&self) -> bool {
        self.stages.iter().all(|(_, fixtures)| fixtures.is_empty())
    }

    fn stage(&self, name: &str) -> Option<&[FixtureRow]> {
        self.stages
            .iter()
            .find(|(stage, _)| stage == name)
            .map(|(_, fixtures)| fixtures.as_slice())
    }
}

/// Stage names that belong to the knockout phase: anything mentioning the
/// final, plus hyphenated rounds ("Quarter-finals", "Round of 16" is
/// intentionally outside this heuristic).
pub fn knockout_stage_names(all: &[String]) -> Vec<String> {
    all.iter()
        .filter(|name| name.contains("Final") || name.contains('-'))
        .cloned()
        .collect()
}

/// Fetches the knockout stages of a UEFA competition and their fixtures.
pub fn derive_bracket(
    api: &dyn SportsApi,
    league_id: u32,
    season: &str,
) -> Result<Bracket, ApiError> {
    let all_stages = api.get_stage_names(league_id, season)?;
    let knockout = knockout_stage_names(&all_stages);
    debug!(league_id, season, stages = knockout.len(), "bracket stages");

    let mut stages = Vec::with_capacity(knockout.len());
    for stage in knockout {
        let query = FixtureQuery {
            league_id: Some(league_id),
            season: Some(season.to_string()),
            stage: Some(stage.clone()),
            ..FixtureQuery::default()
        };
        let fixtures = convert_fixtures(&api.get_fixtures(&query)?);
        stages.push((stage, fixtures));
    }
    Ok(Bracket { stages })
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedTeam {
    pub rank: u32,
    pub team_id: u64,
    pub team: String,
}

/// Infers final placements from bracket results.
///
/// Winner and runner-up come from the Final's winner flag; 3rd/4th are the
/// semi-final losers and 5th-8th the quarter-final losers, each in stage
/// fixture order (the order among same-stage losers carries no meaning).
/// Stages that are missing or undecided truncate the ranking; nothing is
/// invented.
pub fn infer_final_ranking(bracket: &Bracket) -> Vec<RankedTeam> {
    let mut places: Vec<RankedTeam> = Vec::new();

    let decided_final = bracket
        .stage(FINAL_STAGE)
        .and_then(|fixtures| fixtures.iter().find(|f| f.winner_id().is_some()));
    let Some(final_match) = decided_final else {
        return places;
    };

    if final_match.winner_id() == Some(final_match.home_id) {
        places.push(ranked(1, final_match.home_id, &final_match.home));
        places.push(ranked(2, final_match.away_id, &final_match.away));
    } else {
        places.push(ranked(1, final_match.away_id, &final_match.away));
        places.push(ranked(2, final_match.home_id, &final_match.home));
    }

    let mut next_rank = 3;
    for stage in [SEMI_FINAL_STAGE, QUARTER_FINAL_STAGE] {
        let Some(fixtures) = bracket.stage(stage) else {
            break;
        };
        for fixture in fixtures {
            let Some((loser_id, loser)) = fixture.loser() else {
                continue;
            };
            // Two-legged ties list each leg; one entry per team is enough.
            if places.iter().any(|p| p.team_id == loser_id) {
                continue;
            }
            places.push(ranked(next_rank, loser_id, loser));
            next_rank += 1;
        }
    }
    places
}

fn ranked(rank: u32, team_id: u64, team: &str) -> RankedTeam {
    RankedTeam {
        rank,
        team_id,
        team: team.to_string(),
    }
}

/// Final placement of one team, by bracket inference.
pub fn team_final_placement(bracket: &Bracket, team_id: u64) -> Option<u32> {
    infer_final_ranking(bracket)
        .into_iter()
        .find(|place| place.team_id == team_id)
        .map(|place| place.rank)
}
