use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::captaincy::{CaptainOption, captaincy_board};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::lineup::{LineupPick, choose_starting_xi};
use crate::manager_state::ManagerState;
use crate::model::SeasonData;
use crate::optimizer::{SquadOutcome, solve_for_objective};
use crate::projection::{ProjectionTable, project_horizons};
use crate::squad::{Squad, SquadStatus};
use crate::transfers::{TransferRequest, TransferSuggestion, suggest_transfer};

/// Which squad a planned lineup was picked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineupSource {
    Saved,
    Optimized,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    #[serde(skip)]
    pub table: ProjectionTable,
    pub optimized: SquadOutcome,
    pub optimized_cost: f64,
    /// Lineup for the manager's own squad when it is legal, else for the
    /// optimized squad when that one is complete.
    pub lineup: Option<LineupPick>,
    pub lineup_source: Option<LineupSource>,
    pub transfer: Option<TransferSuggestion>,
    pub captaincy: Vec<CaptainOption>,
    pub notes: Vec<String>,
}

/// One pass: project every configured horizon, build an optimized squad,
/// then pick a lineup and a transfer for whichever squad is usable.
pub fn plan(season: &SeasonData, manager: &ManagerState, cfg: &EngineConfig) -> Result<PlanReport> {
    let rules = &cfg.squad;
    let mut horizons = cfg.horizons.clone();
    horizons.extend([1, rules.objective_horizon]);
    let table = project_horizons(season, &horizons, cfg)?;
    let mut notes = Vec::new();

    let optimized = solve_for_objective(&season.players, &table, manager.budget, rules);
    let index = season.player_index();
    let optimized_cost: f64 = optimized
        .ids()
        .iter()
        .filter_map(|id| index.get(id).map(|p| p.price))
        .sum();
    if let SquadOutcome::Incomplete { unfilled, .. } = &optimized {
        notes.push(format!(
            "[WARN] Budget {:.1} left {unfilled} squad slots unfilled",
            manager.budget
        ));
    }

    let own = if manager.squad.is_empty() {
        None
    } else {
        match Squad::from_ids(&manager.squad, &index, rules.quotas, rules.max_per_club) {
            Ok(squad) if squad.status() == SquadStatus::Legal => Some(squad),
            Ok(squad) => {
                warn!(players = squad.len(), "saved squad is not legal");
                notes.push("[WARN] Saved squad is not legal; transfers skipped".to_string());
                None
            }
            Err(err) => {
                warn!("saved squad rejected: {err}");
                notes.push(format!("[WARN] Saved squad rejected: {err}"));
                None
            }
        }
    };

    let lineup_squad = match &own {
        Some(squad) => Some((LineupSource::Saved, squad.clone())),
        None if optimized.is_complete() => {
            Squad::from_ids(optimized.ids(), &index, rules.quotas, rules.max_per_club)
                .ok()
                .map(|squad| (LineupSource::Optimized, squad))
        }
        None => None,
    };
    let lineup = match &lineup_squad {
        Some((_, squad)) => Some(choose_starting_xi(squad, &table, 1, rules)?),
        None => None,
    };
    let lineup_source = lineup_squad.as_ref().map(|(source, _)| *source);

    let transfer = match &own {
        Some(squad) => {
            let request = TransferRequest {
                free_transfers: manager.free_transfers,
                ..TransferRequest::new(manager.bank, manager.budget, rules)
            };
            Some(suggest_transfer(squad, &season.players, &table, &request, rules)?)
        }
        None => None,
    };

    let pool: HashSet<u32> = lineup_squad
        .map(|(_, s)| s.ids().into_iter().collect())
        .unwrap_or_default();
    let captaincy = captaincy_board(
        season.players.iter().filter(|p| pool.is_empty() || pool.contains(&p.id)),
        &table,
        1,
        5,
    );

    info!(
        players = season.players.len(),
        complete = optimized.is_complete(),
        cost = optimized_cost,
        "plan ready"
    );
    Ok(PlanReport {
        table,
        optimized,
        optimized_cost,
        lineup,
        lineup_source,
        transfer,
        captaincy,
        notes,
    })
}

impl PlanReport {
    /// Writes the plan into the manager record. A manager without a squad
    /// adopts the complete optimized one; the lineup is stored only when it
    /// was picked from the squad the record now holds.
    pub fn commit_to(&self, manager: &mut ManagerState) {
        if manager.squad.is_empty() && self.optimized.is_complete() {
            manager.set_squad(&self.optimized, manager.budget - self.optimized_cost);
        }
        let Some(pick) = &self.lineup else {
            return;
        };
        let owned = match self.lineup_source {
            Some(LineupSource::Saved) => true,
            Some(LineupSource::Optimized) => manager.squad.as_slice() == self.optimized.ids(),
            None => false,
        };
        if owned && pick.xi.iter().all(|id| manager.squad.contains(id)) {
            manager.apply_lineup(pick);
        } else {
            warn!("lineup belongs to a different squad; saved starters left unchanged");
        }
    }
}
