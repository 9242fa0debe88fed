use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::config::SquadRules;
use crate::error::SquadError;
use crate::model::Player;
use crate::projection::ProjectionTable;
use crate::squad::Squad;

const BANK_EPS: f64 = 1e-9;
const BUDGET_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransferRequest {
    pub bank: f64,
    pub budget: f64,
    pub max_per_club: usize,
    pub free_transfers: u32,
    /// EP horizon the swap is judged on.
    pub horizon: u8,
}

impl TransferRequest {
    pub fn new(bank: f64, budget: f64, rules: &SquadRules) -> Self {
        Self {
            bank,
            budget,
            max_per_club: rules.max_per_club,
            free_transfers: 1,
            horizon: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TransferSuggestion {
    Swap {
        out_id: u32,
        in_id: u32,
        ep_delta: f64,
        hit: f64,
        net_gain: f64,
        price_delta: f64,
    },
    NoImprovement,
}

impl TransferSuggestion {
    /// Applies a suggested swap to the squad. `NoImprovement` is a no-op.
    pub fn apply(&self, squad: &mut Squad, players: &HashMap<u32, &Player>) -> Result<(), SquadError> {
        if let TransferSuggestion::Swap { out_id, in_id, .. } = self {
            let incoming = players.get(in_id).ok_or(SquadError::UnknownPlayer(*in_id))?;
            squad.replace(*out_id, incoming)?;
        }
        Ok(())
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Best single like-for-like swap. A pair is legal when the price rise fits
/// the bank, the new squad value fits the budget, and the incoming club stays
/// under the cap once the outgoing player's place is vacated.
pub fn suggest_transfer(
    squad: &Squad,
    players: &[Player],
    table: &ProjectionTable,
    request: &TransferRequest,
    rules: &SquadRules,
) -> Result<TransferSuggestion, SquadError> {
    squad.require_legal()?;

    let hit = if request.free_transfers == 0 {
        rules.transfer_hit
    } else {
        0.0
    };
    let total = squad.total_cost();

    let mut pool: Vec<&Player> = players.iter().filter(|p| !squad.contains(p.id)).collect();
    pool.sort_by(|a, b| {
        table
            .ep(b.id, request.horizon)
            .total_cmp(&table.ep(a.id, request.horizon))
            .then(a.id.cmp(&b.id))
    });

    let mut best: Option<(u32, &Player, f64)> = None;
    for out in squad.slots() {
        let out_ep = table.ep(out.player_id, request.horizon);
        for cand in pool.iter().filter(|p| p.position == out.position) {
            let price_delta = cand.price - out.price;
            if price_delta > request.bank + BANK_EPS {
                continue;
            }
            if total - out.price + cand.price > request.budget + BUDGET_EPS {
                continue;
            }
            let vacated = usize::from(out.club_id == cand.club_id);
            if squad.club_count(cand.club_id) - vacated >= request.max_per_club {
                continue;
            }
            // Pool is EP-sorted, so the first legal candidate is this slot's best.
            let delta = table.ep(cand.id, request.horizon) - out_ep;
            if best.is_none_or(|(_, _, b)| delta > b) {
                best = Some((out.player_id, cand, delta));
            }
            break;
        }
    }

    match best {
        Some((out_id, incoming, delta)) if delta - hit > BANK_EPS => {
            let out_price = squad.get(out_id).map(|s| s.price).unwrap_or(0.0);
            debug!(out_id, in_id = incoming.id, delta, hit, "transfer found");
            Ok(TransferSuggestion::Swap {
                out_id,
                in_id: incoming.id,
                ep_delta: round2(delta),
                hit,
                net_gain: round2(delta - hit),
                price_delta: round2(incoming.price - out_price),
            })
        }
        _ => {
            debug!(hit, "no improving transfer");
            Ok(TransferSuggestion::NoImprovement)
        }
    }
}
