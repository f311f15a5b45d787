mod common;

use common::{
    fixture_entry, fixtures_doc, standing_entry, standings_doc, teams_doc, Fail, ScriptedApi,
};
use serde_json::json;

use footy_terminal::dispatch::{
    clarify_league_prompt, ClarifyNeed, Dispatcher, FixtureMode, Intent, ParsedQuery, Reply,
    Session, Sport, MSG_BAD_DATE, MSG_BRACKET_UEFA_ONLY, MSG_COMING_SOON, MSG_DONT_UNDERSTAND,
    MSG_OUT_OF_SCOPE, MSG_RATE_LIMITED, MSG_REMOTE_DOWN,
};
use footy_terminal::resolver::IdentityStore;
use footy_terminal::standings::StageTables;

fn football(intent: Intent) -> ParsedQuery {
    ParsedQuery {
        intent,
        sport: Sport::Football,
        ..ParsedQuery::default()
    }
}

fn message(reply: &Reply) -> &str {
    match reply {
        Reply::Message(text) => text.as_str(),
        other => panic!("expected a message reply, got {other:?}"),
    }
}

#[test]
fn roadmap_sports_never_hit_the_fetcher() {
    let api = ScriptedApi::default();
    let store = IdentityStore::open_in_memory().expect("store");
    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();

    for sport in [Sport::Basketball, Sport::Rugby, Sport::F1] {
        let parsed = ParsedQuery {
            intent: Intent::Unsupported,
            sport,
            ..ParsedQuery::default()
        };
        let reply = dispatcher.dispatch(&mut session, parsed);
        assert_eq!(message(&reply), MSG_COMING_SOON);
    }
    assert_eq!(api.total_calls(), 0);
    assert!(session.pending.is_none());
}

#[test]
fn out_of_scope_input_gets_the_rejection_message() {
    let api = ScriptedApi::default();
    let store = IdentityStore::open_in_memory().expect("store");
    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();

    let reply = dispatcher.dispatch(&mut session, ParsedQuery::unsupported());
    assert_eq!(message(&reply), MSG_OUT_OF_SCOPE);
    assert_eq!(api.total_calls(), 0);
}

#[test]
fn unrecognized_intent_with_football_sport() {
    let api = ScriptedApi::default();
    let store = IdentityStore::open_in_memory().expect("store");
    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();

    let reply = dispatcher.dispatch(&mut session, football(Intent::Unsupported));
    assert_eq!(message(&reply), MSG_DONT_UNDERSTAND);
    assert_eq!(api.total_calls(), 0);
}

#[test]
fn clarification_stall_and_resume() {
    let api = ScriptedApi {
        standings: standings_doc(
            39,
            vec![vec![
                standing_entry(1, 40, "Liverpool", None),
                standing_entry(2, 42, "Arsenal", None),
            ]],
        ),
        ..ScriptedApi::default()
    };
    let store = IdentityStore::open_in_memory().expect("store");
    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();

    // Turn 1: the league name resolves to nothing, so the turn stalls.
    let parsed = ParsedQuery {
        league_name: Some("Ruritanian First Division".to_string()),
        season: Some("2021/22".to_string()),
        ..football(Intent::Standings)
    };
    let reply = dispatcher.dispatch(&mut session, parsed);
    assert_eq!(message(&reply), clarify_league_prompt());
    let pending = session.pending.as_ref().expect("pending context");
    assert_eq!(pending.need, ClarifyNeed::League);
    assert_eq!(pending.parsed.season.as_deref(), Some("2021/22"));
    assert_eq!(api.count("standings"), 0);

    // Turn 2: the answer is consumed, the stored query resumes, and the
    // season survives without being asked again.
    let reply = dispatcher.handle_turn(&mut session, "Premier League", |_| {
        panic!("clarification answers are not re-parsed")
    });
    assert!(session.pending.is_none());
    match reply {
        Reply::Standings { league, season, .. } => {
            assert_eq!(league, "Premier League");
            assert_eq!(season, "2021");
        }
        other => panic!("expected standings, got {other:?}"),
    }
    assert_eq!(api.count("standings:39:2021"), 1);
}

#[test]
fn unrelated_answer_after_stall_is_parsed_fresh() {
    let api = ScriptedApi::default();
    let store = IdentityStore::open_in_memory().expect("store");
    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();

    let parsed = football(Intent::Standings);
    dispatcher.dispatch(&mut session, parsed);
    assert!(session.pending.is_some());

    let reply = dispatcher.handle_turn(&mut session, "tell me a joke", |_| {
        ParsedQuery::unsupported()
    });
    assert_eq!(message(&reply), MSG_OUT_OF_SCOPE);
    assert!(session.pending.is_none());
}

#[test]
fn remote_failure_during_clarification_keeps_the_slot() {
    let store = IdentityStore::open_in_memory().expect("store");
    let api = ScriptedApi::default();
    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();
    dispatcher.dispatch(&mut session, football(Intent::Standings));
    assert!(session.pending.is_some());
    drop(dispatcher);

    // The league search for the answer dies; the stall must survive.
    let failing = ScriptedApi {
        fail: Fail::Remote,
        ..ScriptedApi::default()
    };
    let mut dispatcher = Dispatcher::new(&failing, &store);
    let reply = dispatcher.handle_turn(&mut session, "Belgian Pro League", |_| {
        panic!("turn should consume the pending slot first")
    });
    assert_eq!(message(&reply), MSG_REMOTE_DOWN);
    assert!(session.pending.is_some());
}

#[test]
fn unparseable_date_fails_the_turn() {
    let api = ScriptedApi {
        teams: teams_doc(49, "Chelsea"),
        ..ScriptedApi::default()
    };
    let store = IdentityStore::open_in_memory().expect("store");
    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();

    let parsed = ParsedQuery {
        team_a: Some("Chelsea".to_string()),
        date: Some("the 5th of whenever".to_string()),
        ..football(Intent::Fixture)
    };
    let reply = dispatcher.dispatch(&mut session, parsed);
    assert_eq!(message(&reply), MSG_BAD_DATE);
    assert!(session.pending.is_none());
    assert_eq!(api.count("fixtures"), 0);
}

#[test]
fn domestic_standings_read_through_the_cache() {
    let api = ScriptedApi {
        standings: standings_doc(
            39,
            vec![vec![
                standing_entry(1, 40, "Liverpool", None),
                standing_entry(2, 42, "Arsenal", None),
            ]],
        ),
        ..ScriptedApi::default()
    };
    let store = IdentityStore::open_in_memory().expect("store");
    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();

    let parsed = ParsedQuery {
        league_name: Some("Premier League".to_string()),
        season: Some("2024".to_string()),
        ..football(Intent::Standings)
    };
    let first = dispatcher.dispatch(&mut session, parsed.clone());
    assert!(matches!(first, Reply::Standings { .. }));
    let second = dispatcher.dispatch(&mut session, parsed);
    assert!(matches!(second, Reply::Standings { .. }));
    // Second turn was served from the standings cache.
    assert_eq!(api.count("standings"), 1);
}

#[test]
fn uefa_standings_classify_by_season() {
    // Eight groups of four, the pre-2024 group-phase shape.
    let tables: Vec<Vec<serde_json::Value>> = "ABCDEFGH"
        .chars()
        .enumerate()
        .map(|(group_idx, letter)| {
            (0..4)
                .map(|slot| {
                    let team_id = (group_idx * 4 + slot + 100) as u64;
                    standing_entry(
                        slot as u32 + 1,
                        team_id,
                        &format!("Club {team_id}"),
                        Some(&format!("Group {letter}")),
                    )
                })
                .collect()
        })
        .collect();
    let groups_doc = standings_doc(2, tables);

    let store = IdentityStore::open_in_memory().expect("store");
    let api = ScriptedApi {
        standings: groups_doc,
        ..ScriptedApi::default()
    };
    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();

    let parsed = ParsedQuery {
        league_name: Some("Champions League".to_string()),
        season: Some("2022".to_string()),
        ..football(Intent::Standings)
    };
    let reply = dispatcher.dispatch(&mut session, parsed);
    match reply {
        Reply::Standings { tables: StageTables::Groups(groups), .. } => {
            assert_eq!(groups.len(), 8);
            assert_eq!(groups[0].0, "Group A");
            assert_eq!(groups[7].0, "Group H");
            assert!(groups.iter().all(|(_, rows)| rows.len() == 4));
        }
        other => panic!("expected group tables, got {other:?}"),
    }

    let parsed = ParsedQuery {
        league_name: Some("Champions League".to_string()),
        season: Some("2024".to_string()),
        ..football(Intent::Standings)
    };
    let reply = dispatcher.dispatch(&mut session, parsed);
    match reply {
        Reply::Standings { tables: StageTables::LeaguePhase(rows), .. } => {
            assert_eq!(rows.len(), 32);
        }
        other => panic!("expected a league-phase table, got {other:?}"),
    }
    // UEFA standings bypass the domestic standings cache.
    assert_eq!(api.count("standings"), 2);
}

#[test]
fn team_filter_reports_ordinal_finish() {
    let api = ScriptedApi {
        standings: standings_doc(
            39,
            vec![vec![
                standing_entry(1, 40, "Liverpool", None),
                standing_entry(2, 42, "Arsenal", None),
            ]],
        ),
        teams: teams_doc(42, "Arsenal"),
        ..ScriptedApi::default()
    };
    let store = IdentityStore::open_in_memory().expect("store");
    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();

    let parsed = ParsedQuery {
        league_name: Some("Premier League".to_string()),
        team_a: Some("Arsenal".to_string()),
        season: Some("2024".to_string()),
        ..football(Intent::Standings)
    };
    let reply = dispatcher.dispatch(&mut session, parsed);
    match reply {
        Reply::TeamFinish { team, rank, group, .. } => {
            assert_eq!(team, "Arsenal");
            assert_eq!(rank, 2);
            assert_eq!(group, None);
        }
        other => panic!("expected a team finish, got {other:?}"),
    }
}

#[test]
fn single_team_fixture_query_is_forced_to_team_mode() {
    let api = ScriptedApi {
        teams: teams_doc(42, "Arsenal"),
        fixtures: fixtures_doc(vec![fixture_entry(
            77,
            "2025-08-02T14:00:00+00:00",
            (42, "Arsenal"),
            (49, "Chelsea"),
            Some((2, 0)),
            Some(true),
        )]),
        ..ScriptedApi::default()
    };
    let store = IdentityStore::open_in_memory().expect("store");
    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();

    let parsed = ParsedQuery {
        team_a: Some("Arsenal".to_string()),
        fixture_mode: Some(FixtureMode::Next),
        count: Some(3),
        ..football(Intent::Fixture)
    };
    let reply = dispatcher.dispatch(&mut session, parsed);
    assert!(matches!(reply, Reply::Fixtures(rows) if rows.len() == 1));

    let query = api.last_fixture_query.borrow().clone().expect("query sent");
    assert_eq!(query.team_id, Some(42));
    assert_eq!(query.next, Some(3));
    assert_eq!(query.h2h, None);

    // Without an explicit mode the lone team falls back to recent results.
    let parsed = ParsedQuery {
        team_a: Some("Arsenal".to_string()),
        ..football(Intent::Fixture)
    };
    dispatcher.dispatch(&mut session, parsed);
    let query = api.last_fixture_query.borrow().clone().expect("query sent");
    assert_eq!(query.team_id, Some(42));
    assert_eq!(query.last, Some(1));
}

#[test]
fn two_team_fixture_infers_league_from_h2h() {
    let api = ScriptedApi {
        teams: teams_doc(49, "Chelsea"),
        h2h_league: Some(39),
        fixtures: fixtures_doc(vec![fixture_entry(
            1035045,
            "2025-05-16T19:00:00+00:00",
            (49, "Chelsea"),
            (33, "Manchester United"),
            Some((1, 0)),
            Some(true),
        )]),
        ..ScriptedApi::default()
    };
    let store = IdentityStore::open_in_memory().expect("store");
    // Seed the second team so both names resolve despite the single-doc fake.
    store.insert_team(33, "Manchester United", Some("England")).expect("seed");

    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();
    let parsed = ParsedQuery {
        team_a: Some("Chelsea".to_string()),
        team_b: Some("Manchester United".to_string()),
        date: Some("16/05/2025".to_string()),
        ..football(Intent::Fixture)
    };
    let reply = dispatcher.dispatch(&mut session, parsed);

    assert_eq!(api.count("h2h_infer"), 1);
    match reply {
        Reply::Fixtures(rows) => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].day(), "2025-05-16");
        }
        other => panic!("expected fixtures, got {other:?}"),
    }
    let query = api.last_fixture_query.borrow().clone().expect("query sent");
    assert_eq!(query.h2h, Some((49, 33)));
}

#[test]
fn fixture_without_any_context_asks_for_more() {
    let api = ScriptedApi::default();
    let store = IdentityStore::open_in_memory().expect("store");
    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();

    let reply = dispatcher.dispatch(&mut session, football(Intent::Fixture));
    assert_eq!(
        message(&reply),
        footy_terminal::dispatch::MSG_NEED_FIXTURE_CONTEXT
    );
    assert_eq!(api.count("fixtures"), 0);
}

#[test]
fn match_events_filter_requested_sections() {
    let api = ScriptedApi {
        teams: teams_doc(49, "Chelsea"),
        fixtures: fixtures_doc(vec![fixture_entry(
            1035045,
            "2025-05-16T19:00:00+00:00",
            (49, "Chelsea"),
            (33, "Manchester United"),
            Some((1, 0)),
            Some(true),
        )]),
        events: json!({"response": [
            {
                "time": {"elapsed": 41},
                "team": {"id": 33, "name": "Manchester United"},
                "player": {"id": 886, "name": "Casemiro"},
                "type": "Card",
                "detail": "Yellow Card"
            },
            {
                "time": {"elapsed": 23},
                "team": {"id": 49, "name": "Chelsea"},
                "player": {"id": 1485, "name": "C. Palmer"},
                "type": "Goal",
                "detail": "Normal Goal"
            }
        ]}),
        ..ScriptedApi::default()
    };
    let store = IdentityStore::open_in_memory().expect("store");
    store.insert_team(33, "Manchester United", Some("England")).expect("seed");

    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();
    let parsed = ParsedQuery {
        team_a: Some("Chelsea".to_string()),
        team_b: Some("Manchester United".to_string()),
        date: Some("2025-05-16".to_string()),
        stats: vec!["yellow_cards".to_string()],
        ..football(Intent::MatchEvents)
    };
    let reply = dispatcher.dispatch(&mut session, parsed);
    match reply {
        Reply::Events { events, stats, .. } => {
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].player, "Casemiro");
            assert!(stats.is_empty());
        }
        other => panic!("expected events, got {other:?}"),
    }
    // Only event sections were requested, so numeric stats are not fetched.
    assert_eq!(api.count("statistics"), 0);
}

#[test]
fn player_query_without_league_stalls_then_resumes() {
    let api = ScriptedApi {
        players: json!({"response": [{"player": {"id": 1100, "name": "Erling Haaland", "firstname": "Erling"}}]}),
        player_stats: json!({"response": [{
            "player": {"id": 1100, "name": "Erling Haaland"},
            "statistics": [{
                "team": {"id": 50, "name": "Manchester City"},
                "league": {"id": 39, "name": "Premier League"},
                "games": {"appearences": 31, "minutes": 2700, "rating": "7.9"},
                "shots": {"total": 110, "on": 62},
                "goals": {"total": 27, "assists": 5},
                "passes": {"total": 420, "key": 31},
                "cards": {"yellow": 3, "red": 0}
            }]
        }]}),
        ..ScriptedApi::default()
    };
    let store = IdentityStore::open_in_memory().expect("store");
    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();

    let parsed = ParsedQuery {
        player_name: Some("Erling Haaland".to_string()),
        season: Some("2024".to_string()),
        stats: vec!["goals".to_string()],
        ..football(Intent::PlayerStats)
    };
    let reply = dispatcher.dispatch(&mut session, parsed);
    assert!(matches!(&reply, Reply::Message(_)));
    let pending = session.pending.as_ref().expect("pending context");
    assert_eq!(pending.need, ClarifyNeed::LeagueForPlayer);
    assert_eq!(api.count("player_stats"), 0);

    let reply = dispatcher.handle_turn(&mut session, "Premier League", |_| {
        panic!("clarification answers are not re-parsed")
    });
    assert!(session.pending.is_none());
    match reply {
        Reply::PlayerStats(stats) => {
            assert_eq!(stats.player, "Erling Haaland");
            assert_eq!(stats.items, vec![("Goals".to_string(), "27".to_string())]);
        }
        other => panic!("expected player stats, got {other:?}"),
    }
    assert_eq!(api.count("player_stats:1100:2024"), 1);
}

#[test]
fn bracket_requires_a_uefa_competition() {
    let api = ScriptedApi::default();
    let store = IdentityStore::open_in_memory().expect("store");
    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();

    let parsed = ParsedQuery {
        league_name: Some("Serie A".to_string()),
        ..football(Intent::Bracket)
    };
    let reply = dispatcher.dispatch(&mut session, parsed);
    assert_eq!(message(&reply), MSG_BRACKET_UEFA_ONLY);
    assert_eq!(api.total_calls(), 0);
}

#[test]
fn bracket_fetches_knockout_stages_only() {
    let semi = fixtures_doc(vec![fixture_entry(
        9001,
        "2023-05-09T19:00:00+00:00",
        (50, "Manchester City"),
        (541, "Real Madrid"),
        Some((4, 0)),
        Some(true),
    )]);
    let final_doc = fixtures_doc(vec![fixture_entry(
        9100,
        "2023-06-10T19:00:00+00:00",
        (50, "Manchester City"),
        (505, "Inter"),
        Some((1, 0)),
        Some(true),
    )]);
    let api = ScriptedApi {
        stage_names: vec![
            "Group Stage".to_string(),
            "Round of 16".to_string(),
            "Quarter-finals".to_string(),
            "Semi-finals".to_string(),
            "Final".to_string(),
        ],
        stage_fixtures: vec![
            ("Semi-finals".to_string(), semi),
            ("Final".to_string(), final_doc),
        ],
        ..ScriptedApi::default()
    };
    let store = IdentityStore::open_in_memory().expect("store");
    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();

    let parsed = ParsedQuery {
        league_name: Some("Champions League".to_string()),
        season: Some("2022/23".to_string()),
        ..football(Intent::Bracket)
    };
    let reply = dispatcher.dispatch(&mut session, parsed);
    match reply {
        Reply::Bracket(bracket) => {
            let names: Vec<&str> = bracket
                .stages
                .iter()
                .map(|(name, _)| name.as_str())
                .collect();
            // "Group Stage" and "Round of 16" fall outside the knockout
            // heuristic (no "Final", no hyphen).
            assert_eq!(names, vec!["Quarter-finals", "Semi-finals", "Final"]);
        }
        other => panic!("expected a bracket, got {other:?}"),
    }
    assert_eq!(api.count("stages:2:2022"), 1);
    assert_eq!(api.count("fixtures"), 3);
}

#[test]
fn rate_limit_and_outage_map_to_their_messages() {
    let store = IdentityStore::open_in_memory().expect("store");

    let api = ScriptedApi {
        fail: Fail::RateLimited,
        ..ScriptedApi::default()
    };
    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();
    let parsed = ParsedQuery {
        league_name: Some("Premier League".to_string()),
        ..football(Intent::Standings)
    };
    let reply = dispatcher.dispatch(&mut session, parsed.clone());
    assert_eq!(message(&reply), MSG_RATE_LIMITED);
    assert!(session.pending.is_none());

    let api = ScriptedApi {
        fail: Fail::Remote,
        ..ScriptedApi::default()
    };
    let mut dispatcher = Dispatcher::new(&api, &store);
    let reply = dispatcher.dispatch(&mut session, parsed);
    assert_eq!(message(&reply), MSG_REMOTE_DOWN);
    assert!(session.pending.is_none());
}
