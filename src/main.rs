use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use fpl_planner::config::EngineConfig;
use fpl_planner::enrichment::{apply_rates, provider_rows_from_json};
use fpl_planner::fixtures::fixture_ticker;
use fpl_planner::logging::init_tracing;
use fpl_planner::manager_state::ManagerState;
use fpl_planner::model::{Position, SeasonData};
use fpl_planner::normalize::parse_season_json;
use fpl_planner::optimizer::{Chip, SquadOutcome, solve_chip};
use fpl_planner::pipeline::{LineupSource, PlanReport, plan};
use fpl_planner::synthetic::{LeagueSpec, synthetic_league};
use fpl_planner::transfers::TransferSuggestion;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing("info")?;

    let cfg = match arg_value("--config") {
        Some(path) => EngineConfig::load(Path::new(&path))?,
        None => EngineConfig::from_env()?,
    };

    let mut notes = Vec::new();
    let season = load_season(&cfg, &mut notes)?;

    let state_path = arg_value("--state").map(PathBuf::from);
    let mut manager = match &state_path {
        Some(path) if path.exists() => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("read manager state {}", path.display()))?;
            ManagerState::from_json(&raw)
        }
        _ => ManagerState::default(),
    };
    if let Some(budget) = parse_f64_arg("--budget") {
        manager.budget = budget;
    }
    if let Some(bank) = parse_f64_arg("--bank") {
        manager.bank = bank;
    }

    let mut report = plan(&season, &manager, &cfg)?;
    notes.append(&mut report.notes);
    report.notes = notes;

    if let Some(raw) = arg_value("--chip") {
        let chip = match raw.to_ascii_lowercase().as_str() {
            "freehit" | "free-hit" | "free_hit" => Chip::FreeHit,
            "wildcard" => Chip::Wildcard,
            other => anyhow::bail!("unknown chip '{other}' (expected free-hit or wildcard)"),
        };
        let outcome = solve_chip(chip, &season.players, &report.table, manager.budget, &cfg.squad);
        report.notes.push(format!(
            "[INFO] {chip:?} squad: {} players, EP{} {:.2}",
            outcome.ids().len(),
            chip.horizon(&cfg.squad),
            report.table.total_ep(outcome.ids(), chip.horizon(&cfg.squad))
        ));
    }

    if has_flag("--json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&season, &report, &cfg);
    }

    if has_flag("--save-state")
        && let Some(path) = &state_path
    {
        report.commit_to(&mut manager);
        fs::write(path, manager.to_json()?)
            .with_context(|| format!("write manager state {}", path.display()))?;
        info!(path = %path.display(), "manager state saved");
    }
    Ok(())
}

fn load_season(cfg: &EngineConfig, notes: &mut Vec<String>) -> Result<SeasonData> {
    let (Some(bootstrap), Some(fixtures)) = (arg_value("--bootstrap"), arg_value("--fixtures")) else {
        let seed = parse_f64_arg("--seed").map(|s| s.max(0.0) as u64).unwrap_or(7);
        warn!(seed, "no --bootstrap/--fixtures given; using a synthetic league");
        notes.push(format!("[INFO] Synthetic league, seed {seed}"));
        return Ok(synthetic_league(&LeagueSpec {
            seed,
            ..LeagueSpec::default()
        }));
    };

    let bootstrap_raw =
        fs::read_to_string(&bootstrap).with_context(|| format!("read {bootstrap}"))?;
    let fixtures_raw =
        fs::read_to_string(&fixtures).with_context(|| format!("read {fixtures}"))?;
    let (mut season, mut ingest) =
        parse_season_json(&bootstrap_raw, &fixtures_raw, &cfg.strength, Utc::now())
            .context("parse fantasy bootstrap/fixtures")?;
    notes.append(&mut ingest.notes);
    info!(
        players = ingest.players_read,
        clubs = ingest.clubs_read,
        fixtures = ingest.fixtures_read,
        round = season.current_round,
        "season loaded"
    );

    // A broken enrichment file degrades EP; it never stops the run.
    let rows = arg_value("--xgxa").and_then(|path| {
        let parsed = fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| {
                serde_json::from_str::<serde_json::Value>(&raw).map_err(anyhow::Error::from)
            });
        match parsed {
            Ok(v) => Some(provider_rows_from_json(&v)),
            Err(err) => {
                warn!("xG/xA file {path} unusable: {err}");
                None
            }
        }
    });
    apply_rates(&mut season.players, rows.as_deref(), &cfg.enrichment, notes);
    Ok(season)
}

fn print_report(season: &SeasonData, report: &PlanReport, cfg: &EngineConfig) {
    let index = season.player_index();
    let name = |id: u32| {
        index
            .get(&id)
            .map(|p| format!("{} ({}, {:.1})", p.name, p.position, p.price))
            .unwrap_or_else(|| format!("#{id}"))
    };

    println!("Round {} | {} players", season.current_round, season.players.len());
    for horizon in report.table.horizons() {
        println!();
        println!("Top projections, next {horizon} round(s):");
        for pos in Position::ALL {
            for row in report.table.top_by_position(pos, *horizon, 3) {
                println!(
                    "  {:<28} EP {:>6.2}  mins {:>5.0}  VFM {:.2}",
                    name(row.player_id),
                    row.ep_total,
                    row.expected_minutes,
                    row.value_for_money
                );
            }
        }
    }

    println!();
    let objective = cfg.squad.objective_horizon;
    match &report.optimized {
        SquadOutcome::Complete(ids) => {
            println!(
                "Optimized squad (cost {:.1}, EP{objective} {:.2}):",
                report.optimized_cost,
                report.table.total_ep(ids, objective)
            );
        }
        SquadOutcome::Incomplete { unfilled, .. } => {
            println!(
                "Squad incomplete: {unfilled} slot(s) unfilled (cost {:.1})",
                report.optimized_cost
            );
        }
    }
    for id in report.optimized.ids() {
        println!("  {}", name(*id));
    }
    let totals: Vec<String> = report
        .table
        .horizon_totals(report.optimized.ids())
        .into_iter()
        .map(|(h, ep)| format!("EP{h} {ep:.2}"))
        .collect();
    println!("  {}", totals.join(" | "));

    if let Some(pick) = &report.lineup {
        println!();
        let from = match report.lineup_source {
            Some(LineupSource::Optimized) => " for the optimized squad",
            _ => "",
        };
        println!("Starting XI{from} ({}), EP {:.2}:", pick.formation, pick.xi_ep);
        for id in &pick.xi {
            let tag = if *id == pick.captain {
                " [C]"
            } else if *id == pick.vice {
                " [V]"
            } else {
                ""
            };
            println!("  {}{tag}", name(*id));
        }
        let bench: Vec<String> = pick.bench.iter().map(|id| name(*id)).collect();
        println!("Bench: {}", bench.join(", "));
    }

    match &report.transfer {
        Some(TransferSuggestion::Swap {
            out_id,
            in_id,
            ep_delta,
            net_gain,
            ..
        }) => {
            println!();
            println!(
                "Transfer: {} -> {} (EP +{ep_delta:.2}, net {net_gain:.2})",
                name(*out_id),
                name(*in_id)
            );
        }
        Some(TransferSuggestion::NoImprovement) => {
            println!();
            println!("Transfer: no improvement found");
        }
        None => {}
    }

    let last = season.current_round + u32::from(cfg.squad.objective_horizon).saturating_sub(1);
    println!();
    println!("Fixture ticker, rounds {}-{last} (easy/hard):", season.current_round);
    for row in fixture_ticker(&season.fixtures, &season.clubs, season.current_round, last)
        .iter()
        .take(6)
    {
        println!("  {:<20} {} fixtures  {}/{}", row.club, row.fixtures, row.easy, row.hard);
    }

    if !report.captaincy.is_empty() {
        println!();
        println!("Captaincy:");
        for c in &report.captaincy {
            println!("  {:<24} EP {:>5.2}  ceiling {:.2}", c.name, c.ep, c.ceiling);
        }
    }

    for note in &report.notes {
        println!("{note}");
    }
}

fn arg_value(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}=")) {
            return Some(raw.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_f64_arg(name: &str) -> Option<f64> {
    arg_value(name).and_then(|v| v.parse::<f64>().ok())
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
