use std::fs;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use serde_json::Value;

use fpl_planner::config::EngineConfig;
use fpl_planner::enrichment::{apply_rates, provider_rows_from_json};
use fpl_planner::fixtures::fixture_ticker;
use fpl_planner::lineup::choose_starting_xi;
use fpl_planner::manager_state::ManagerState;
use fpl_planner::model::{Position, SeasonData};
use fpl_planner::normalize::parse_season_json;
use fpl_planner::pipeline::{LineupSource, plan};
use fpl_planner::projection::{project_horizon, project_horizons};
use fpl_planner::squad::Squad;
use fpl_planner::transfers::TransferSuggestion;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn load(with_xgxa: bool) -> SeasonData {
    let cfg = EngineConfig::default();
    let now = Utc.with_ymd_and_hms(2024, 8, 28, 12, 0, 0).unwrap();
    let (mut season, _) = parse_season_json(
        &read_fixture("bootstrap.json"),
        &read_fixture("fixtures.json"),
        &cfg.strength,
        now,
    )
    .expect("fixtures should parse");
    let rows = with_xgxa.then(|| {
        let v: Value = serde_json::from_str(&read_fixture("xgxa.json")).unwrap();
        provider_rows_from_json(&v)
    });
    let mut notes = Vec::new();
    apply_rates(&mut season.players, rows.as_deref(), &cfg.enrichment, &mut notes);
    season
}

#[test]
fn ingests_bootstrap_and_fixtures() {
    let cfg = EngineConfig::default();
    let now = Utc.with_ymd_and_hms(2024, 8, 28, 12, 0, 0).unwrap();
    let (season, report) = parse_season_json(
        &read_fixture("bootstrap.json"),
        &read_fixture("fixtures.json"),
        &cfg.strength,
        now,
    )
    .unwrap();

    assert_eq!(report.players_read, 36);
    assert_eq!(report.players_skipped, 2);
    assert_eq!(report.clubs_read, 6);
    assert_eq!(report.fixtures_skipped, 1);
    assert_eq!(season.current_round, 3);
    assert_eq!(season.completed_rounds, 2);

    let index = season.player_index();
    assert_eq!(index[&4].price, 8.5);
    assert_eq!(index[&4].chance_of_playing, Some(0.0));
    assert_eq!(index[&10].chance_of_playing, Some(50.0));
    assert_eq!(index[&1].chance_of_playing, None);
    assert_eq!(index[&6].full_name, "José Sá");
    assert_eq!(index[&6].position, Position::Forward);
    assert_eq!(index[&1].club, "Northbridge");

    let mean_attack: f64 =
        season.clubs.iter().map(|c| c.strength.attack).sum::<f64>() / season.clubs.len() as f64;
    assert!((mean_attack - 3.0).abs() < 1e-9);
}

#[test]
fn enrichment_fills_rates_and_degrades_without_source() {
    let season = load(true);
    let index = season.player_index();
    assert!((index[&6].xg_per90 - 0.45).abs() < 1e-9);
    assert!((index[&12].xg_per90 - 0.6).abs() < 1e-9);
    assert!((index[&16].xa_per90 - 0.2).abs() < 1e-9);
    assert_eq!(index[&30].xg_per90, 0.0);

    let mut players = season.players.clone();
    let v: Value = serde_json::from_str(&read_fixture("xgxa.json")).unwrap();
    let rows = provider_rows_from_json(&v);
    assert_eq!(rows.len(), 4);
    let mut notes = Vec::new();
    let summary = apply_rates(&mut players, Some(&rows), &EngineConfig::default().enrichment, &mut notes);
    assert_eq!(summary.source_rows, 4);
    assert_eq!(summary.matched_by_id, 1);
    assert_eq!(summary.matched_by_name, 1);
    assert_eq!(summary.matched_fuzzy, 1);
    assert_eq!(summary.unmatched, 33);
    assert!(!summary.degraded);

    let bare = load(false);
    assert!(bare.players.iter().all(|p| p.xg_per90 == 0.0 && p.xa_per90 == 0.0));
    // Degraded accuracy, not a failure: projections still run.
    let rows = project_horizon(&bare, 1, &EngineConfig::default()).unwrap();
    assert_eq!(rows.len(), 36);
    assert!(rows.iter().any(|r| r.ep_total > 0.0));
}

#[test]
fn blank_clubs_score_zero_and_doubles_count_twice() {
    let season = load(true);
    let cfg = EngineConfig::default();
    let table = project_horizons(&season, &[1, 2], &cfg).unwrap();

    // Clubs 2 and 6 blank in round 3.
    for p in season.players.iter().filter(|p| p.club_id == 2 || p.club_id == 6) {
        let row = table.get(p.id, 1).unwrap();
        assert_eq!(row.fixture_count, 0);
        assert_eq!(row.ep_total, 0.0, "player {}", p.id);
        assert_eq!(row.expected_minutes, 0.0);
    }
    // Club 1 plays once in round 3 and twice in round 4.
    let keeper = table.get(1, 2).unwrap();
    assert_eq!(keeper.fixture_count, 3);
    assert!(table.ep(1, 2) > table.ep(1, 1));
}

#[test]
fn ruled_out_player_gets_no_minutes() {
    let season = load(true);
    let table = project_horizons(&season, &[1, 2, 3], &EngineConfig::default()).unwrap();
    for h in [1, 2, 3] {
        let row = table.get(4, h).unwrap();
        assert!(row.fixture_count > 0);
        assert_eq!(row.expected_minutes, 0.0);
        assert_eq!(row.attacking_points, 0.0);
        // Appearance and clean-sheet terms are flat per fixture.
        assert_eq!(row.appearance_points, 2.0 * row.fixture_count as f64);
        assert!((row.clean_sheet_points - row.clean_sheet_prob).abs() < 1e-12);
    }
}

#[test]
fn projection_is_deterministic() {
    let season = load(true);
    let cfg = EngineConfig::default();
    for h in [1, 3, 5] {
        let a = project_horizon(&season, h, &cfg).unwrap();
        let b = project_horizon(&season, h, &cfg).unwrap();
        assert_eq!(a, b);
    }
    let a = project_horizons(&season, &[1, 3, 5], &cfg).unwrap();
    let b = project_horizons(&season, &[5, 3, 1], &cfg).unwrap();
    assert_eq!(a.rows(), b.rows());
}

#[test]
fn ticker_sees_the_blank() {
    let season = load(false);
    let rows = fixture_ticker(&season.fixtures, &season.clubs, 3, 3);
    let club6 = rows.iter().find(|r| r.club_id == 6).unwrap();
    assert_eq!(club6.fixtures, 0);
    let club1 = fixture_ticker(&season.fixtures, &season.clubs, 4, 4)
        .into_iter()
        .find(|r| r.club_id == 1)
        .unwrap();
    assert_eq!(club1.fixtures, 2);
}

#[test]
fn plan_builds_squad_lineup_and_transfer() {
    let season = load(true);
    let cfg = EngineConfig::default();

    let fresh = plan(&season, &ManagerState::default(), &cfg).unwrap();
    assert!(fresh.optimized.is_complete());
    assert!(fresh.optimized_cost <= 100.0 + 1e-6);
    assert!(fresh.transfer.is_none());
    let lineup = fresh.lineup.clone().expect("complete squad gets a lineup");
    assert_eq!(lineup.xi.len(), 11);
    assert_ne!(lineup.captain, lineup.vice);
    assert_eq!(fresh.lineup_source, Some(LineupSource::Optimized));

    let mut manager = ManagerState::default();
    fresh.commit_to(&mut manager);
    assert_eq!(manager.squad.as_slice(), fresh.optimized.ids());
    assert_eq!(manager.starters, lineup.xi);
    assert_eq!(manager.captain, Some(lineup.captain));

    let again = plan(&season, &manager, &cfg).unwrap();
    assert!(again.transfer.is_some());
    assert_eq!(again.lineup_source, Some(LineupSource::Saved));
    assert_eq!(again.lineup.as_ref().map(|l| l.xi.len()), Some(11));
}

// Six of these play for clubs 2 and 6, which blank in round 3.
const BLANK_HEAVY_SQUAD: [u32; 15] = [7, 31, 8, 32, 33, 20, 21, 10, 23, 28, 29, 16, 30, 18, 6];

#[test]
fn saved_squad_with_blank_players_gets_an_affordable_swap() {
    let season = load(true);
    let cfg = EngineConfig::default();
    let index = season.player_index();
    let mut squad =
        Squad::from_ids(&BLANK_HEAVY_SQUAD, &index, cfg.squad.quotas, cfg.squad.max_per_club).unwrap();
    assert!(squad.validate().is_ok());
    let manager = ManagerState {
        squad: BLANK_HEAVY_SQUAD.to_vec(),
        bank: 100.0 - squad.total_cost(),
        ..ManagerState::default()
    };

    let report = plan(&season, &manager, &cfg).unwrap();
    let Some(TransferSuggestion::Swap {
        out_id,
        in_id,
        ep_delta,
        ..
    }) = report.transfer
    else {
        panic!("expected a swap, got {:?}", report.transfer);
    };
    assert!(ep_delta > 0.0);
    assert!(manager.squad.contains(&out_id) && !manager.squad.contains(&in_id));

    let before = squad.total_cost();
    squad.replace(out_id, index[&in_id]).unwrap();
    assert!(squad.total_cost() - before <= manager.bank + 1e-9);
    assert!(squad.validate().is_ok());
}

#[test]
fn saved_lineup_stays_inside_the_saved_squad() {
    let season = load(true);
    let cfg = EngineConfig::default();

    let mut manager = ManagerState {
        squad: BLANK_HEAVY_SQUAD.to_vec(),
        bank: 2.0,
        ..ManagerState::default()
    };
    let report = plan(&season, &manager, &cfg).unwrap();
    assert_eq!(report.lineup_source, Some(LineupSource::Saved));
    report.commit_to(&mut manager);
    assert_eq!(manager.squad, BLANK_HEAVY_SQUAD.to_vec());
    assert_eq!(manager.starters.len(), 11);
    assert!(manager.starters.iter().all(|id| manager.squad.contains(id)));

    // An illegal squad gets a lineup for the optimized squad, which must not
    // be written over the saved one.
    let mut manager = ManagerState {
        squad: vec![1, 2, 3, 7],
        starters: vec![1, 2],
        ..ManagerState::default()
    };
    let report = plan(&season, &manager, &cfg).unwrap();
    assert!(report.lineup.is_some());
    assert_eq!(report.lineup_source, Some(LineupSource::Optimized));
    report.commit_to(&mut manager);
    assert_eq!(manager.squad, vec![1, 2, 3, 7]);
    assert_eq!(manager.starters, vec![1, 2]);
    assert_eq!(manager.captain, None);
}

#[test]
fn illegal_saved_squad_is_reported_not_fatal() {
    let season = load(true);
    let cfg = EngineConfig::default();
    let manager = ManagerState {
        squad: vec![1, 2, 3, 7],
        ..ManagerState::default()
    };
    let report = plan(&season, &manager, &cfg).unwrap();
    assert!(report.transfer.is_none());
    assert!(report.notes.iter().any(|n| n.contains("not legal")));

    let index = season.player_index();
    let squad = Squad::from_ids(&[1, 2, 3, 7], &index, cfg.squad.quotas, cfg.squad.max_per_club).unwrap();
    let table = project_horizons(&season, &[1], &cfg).unwrap();
    assert!(choose_starting_xi(&squad, &table, 1, &cfg.squad).is_err());
}
