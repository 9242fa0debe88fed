use anyhow::Result;

use fpl_planner::config::EngineConfig;
use fpl_planner::logging::init_tracing;
use fpl_planner::optimizer::{SquadOutcome, solve_for_objective};
use fpl_planner::projection::project_horizons;
use fpl_planner::synthetic::{LeagueSpec, synthetic_league};

/// Runs the squad optimizer across a budget range on a synthetic league and
/// reports completeness, spend and objective EP for each budget.
fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing("warn")?;

    let cfg = EngineConfig::from_env()?;
    let from = parse_f64_arg("--from").unwrap_or(60.0);
    let to = parse_f64_arg("--to").unwrap_or(110.0);
    let step = parse_f64_arg("--step").unwrap_or(5.0).max(0.1);
    let seed = parse_f64_arg("--seed").map(|s| s.max(0.0) as u64).unwrap_or(7);

    let spec = LeagueSpec {
        seed,
        start_round: parse_f64_arg("--round").map(|r| r.max(1.0) as u32).unwrap_or(1),
        ..LeagueSpec::default()
    };
    let season = synthetic_league(&spec);
    let objective = cfg.squad.objective_horizon;
    let table = project_horizons(&season, &[objective], &cfg)?;
    let index = season.player_index();

    println!("seed={seed} players={} objective=EP{objective}", season.players.len());
    println!("{:>8} {:>10} {:>8} {:>8} {:>9}", "budget", "status", "picked", "cost", "ep");
    let mut budget = from;
    while budget <= to + 1e-9 {
        let outcome = solve_for_objective(&season.players, &table, budget, &cfg.squad);
        let ids = outcome.ids();
        let cost: f64 = ids.iter().filter_map(|id| index.get(id).map(|p| p.price)).sum();
        let status = match &outcome {
            SquadOutcome::Complete(_) => "complete".to_string(),
            SquadOutcome::Incomplete { unfilled, .. } => format!("short {unfilled}"),
        };
        println!(
            "{budget:>8.1} {status:>10} {:>8} {cost:>8.1} {:>9.2}",
            ids.len(),
            table.total_ep(ids, objective)
        );
        if cost > budget + 1e-6 {
            anyhow::bail!("budget {budget:.1} overspent: {cost:.2}");
        }
        budget += step;
    }
    Ok(())
}

fn parse_f64_arg(name: &str) -> Option<f64> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<f64>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<f64>()
        {
            return Some(v);
        }
    }
    None
}
