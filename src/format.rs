use crate::bracket::Bracket;
use crate::dispatch::Reply;
use crate::events::{MatchEvent, TeamStats};
use crate::fixtures::FixtureRow;
use crate::player_stats::PlayerSeasonStats;
use crate::standings::{StageTables, StandingRow};

/// Renders a resolved reply to the display string for one turn. Pure
/// formatting; every decision about what to show was made upstream.
pub fn render(reply: &Reply) -> String {
    match reply {
        Reply::Message(text) => text.clone(),
        Reply::Standings {
            league,
            season,
            tables,
        } => fmt_tables(league, season, tables),
        Reply::TeamFinish {
            team,
            league,
            season,
            rank,
            group,
        } => match group {
            Some(group) => format!(
                "{team} finished {} in {group} of the {league} {season} season.",
                ordinal(*rank)
            ),
            None => format!(
                "{team} finished {} in the {league} {season} season.",
                ordinal(*rank)
            ),
        },
        Reply::Fixtures(rows) => rows
            .iter()
            .map(fmt_fixture_line)
            .collect::<Vec<_>>()
            .join("\n"),
        Reply::Events {
            fixture,
            events,
            stats,
        } => fmt_match_report(fixture, events, stats),
        Reply::PlayerStats(stats) => fmt_player_stats(stats),
        Reply::Bracket(bracket) => fmt_bracket(bracket),
    }
}

fn fmt_tables(league: &str, season: &str, tables: &StageTables) -> String {
    match tables {
        StageTables::LeaguePhase(rows) => {
            format!("{league} {season}\n{}", fmt_standings(rows))
        }
        StageTables::Groups(groups) => {
            let mut out = vec![format!("{league} {season}")];
            for (label, rows) in groups {
                out.push(format!("\n{label}"));
                out.push(fmt_standings(rows));
            }
            out.join("\n")
        }
    }
}

pub fn fmt_standings(rows: &[StandingRow]) -> String {
    let mut out = vec!["Pos  Club                     P  W  D  L  GD  Pts".to_string()];
    for row in rows {
        out.push(format!(
            "{:>2}  {:<22} {:>2} {:>2} {:>2} {:>2} {:>3} {:>3}",
            row.rank, row.team, row.played, row.win, row.draw, row.lose, row.gd, row.pts
        ));
    }
    out.join("\n")
}

pub fn fmt_fixture_line(fixture: &FixtureRow) -> String {
    match (fixture.home_goals, fixture.away_goals) {
        (Some(home_goals), Some(away_goals)) => format!(
            "{} {home_goals}–{away_goals} {}  ({})",
            fixture.home,
            fixture.away,
            fixture.day()
        ),
        _ => format!("{} vs {}  ({})", fixture.home, fixture.away, fixture.day()),
    }
}

fn fmt_match_report(fixture: &FixtureRow, events: &[MatchEvent], stats: &[TeamStats]) -> String {
    let mut sections = vec![fmt_fixture_line(fixture)];
    if !events.is_empty() {
        sections.push(fmt_events(events));
    }
    for team in stats {
        if team.stats.is_empty() {
            continue;
        }
        let line = team
            .stats
            .iter()
            .map(|(kind, value)| format!("{kind}: {value}"))
            .collect::<Vec<_>>()
            .join(", ");
        sections.push(format!("{}: {line}", team.team));
    }
    sections.join("\n")
}

pub fn fmt_events(events: &[MatchEvent]) -> String {
    if events.is_empty() {
        return "No notable events.".to_string();
    }
    events
        .iter()
        .map(|event| {
            format!(
                "{:>2}′  {}: {}  ({} – {})",
                event.minute, event.team, event.player, event.kind, event.detail
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn fmt_player_stats(stats: &PlayerSeasonStats) -> String {
    let mut header = format!("{} – Season {}", stats.player, stats.season);
    if let Some(team) = &stats.team {
        header.push_str(&format!(" ({team})"));
    }
    let body = stats
        .items
        .iter()
        .map(|(label, value)| format!("{label}: {value}"))
        .collect::<Vec<_>>()
        .join("  |  ");
    format!("{header}\n{body}")
}

fn fmt_bracket(bracket: &Bracket) -> String {
    let mut out = Vec::new();
    for (stage, fixtures) in &bracket.stages {
        out.push(format!("== {stage} =="));
        if fixtures.is_empty() {
            out.push("(no fixtures)".to_string());
            continue;
        }
        for fixture in fixtures {
            out.push(fmt_fixture_line(fixture));
        }
    }
    out.join("\n")
}

pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (1, 11) | (2, 12) | (3, 13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
