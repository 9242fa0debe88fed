use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SquadRules;
use crate::model::{PerPosition, Player, Position};
use crate::projection::ProjectionTable;

const BUDGET_EPS: f64 = 1e-9;

/// What the optimizer needs to know about one player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
    pub player_id: u32,
    pub position: Position,
    pub club_id: u32,
    pub price: f64,
    pub ep: f64,
}

impl Candidate {
    pub fn value_for_money(&self, price_floor: f64) -> f64 {
        self.ep / self.price.max(price_floor)
    }
}

pub fn candidates_from(players: &[Player], table: &ProjectionTable, horizon: u8) -> Vec<Candidate> {
    players
        .iter()
        .map(|p| Candidate {
            player_id: p.id,
            position: p.position,
            club_id: p.club_id,
            price: p.price,
            ep: table.ep(p.id, horizon),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SquadOutcome {
    Complete(Vec<u32>),
    /// Budget or pool could not fill every slot. `picked` is what was chosen.
    Incomplete { picked: Vec<u32>, unfilled: usize },
}

impl SquadOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, SquadOutcome::Complete(_))
    }

    pub fn ids(&self) -> &[u32] {
        match self {
            SquadOutcome::Complete(ids) => ids,
            SquadOutcome::Incomplete { picked, .. } => picked,
        }
    }
}

/// The interleaved draft order trimmed to the quotas, then topped up with
/// any position still short, in GK, DEF, MID, FWD order.
pub fn draft_rounds(rules: &SquadRules) -> Vec<Position> {
    let mut left = rules.quotas;
    let mut rounds = Vec::with_capacity(rules.squad_size());
    for pos in &rules.draft_order {
        let need = left.get_mut(*pos);
        if *need > 0 {
            rounds.push(*pos);
            *need -= 1;
        }
    }
    for pos in Position::ALL {
        for _ in 0..left.get(pos) {
            rounds.push(pos);
        }
    }
    rounds
}

struct DraftState<'a> {
    chosen: HashSet<u32>,
    picked: Vec<u32>,
    clubs: HashMap<u32, usize>,
    remaining: f64,
    open: PerPosition<usize>,
    by_price: PerPosition<Vec<&'a Candidate>>,
    max_per_club: usize,
}

impl<'a> DraftState<'a> {
    fn club_ok(&self, c: &Candidate) -> bool {
        self.clubs.get(&c.club_id).copied().unwrap_or(0) < self.max_per_club
    }

    fn available(&self, c: &Candidate) -> bool {
        !self.chosen.contains(&c.player_id) && self.club_ok(c)
    }

    /// Cheapest cost of filling every other open slot once `c` is taken.
    fn reserve_without(&self, c: &Candidate) -> f64 {
        let mut total = 0.0;
        for pos in Position::ALL {
            let mut need = self.open.get(pos);
            if pos == c.position {
                need = need.saturating_sub(1);
            }
            total += self
                .by_price
                .at(pos)
                .iter()
                .filter(|o| o.player_id != c.player_id && !self.chosen.contains(&o.player_id))
                .take(need)
                .map(|o| o.price)
                .sum::<f64>();
        }
        total
    }

    fn fits(&self, c: &Candidate) -> bool {
        c.price + self.reserve_without(c) <= self.remaining + BUDGET_EPS
    }

    fn take(&mut self, c: &Candidate) {
        self.chosen.insert(c.player_id);
        self.picked.push(c.player_id);
        *self.clubs.entry(c.club_id).or_default() += 1;
        *self.open.get_mut(c.position) -= 1;
        self.remaining -= c.price;
    }
}

/// Greedy squad build. Heuristic, not an exact solver.
///
/// Each draft round takes the best value-for-money candidate of that position
/// that is unchosen, keeps its club under the cap, and leaves enough budget
/// to fill the remaining open slots at their cheapest. When nothing in the
/// ranked pool qualifies, the cheapest viable candidate is taken instead.
pub fn solve_squad(
    candidates: &[Candidate],
    budget: f64,
    max_per_club: usize,
    rules: &SquadRules,
) -> SquadOutcome {
    let floor = rules.price_floor;
    let mut ranked: PerPosition<Vec<&Candidate>> = PerPosition::default();
    for c in candidates {
        ranked.get_mut(c.position).push(c);
    }
    let mut by_price = ranked.clone();
    for pos in Position::ALL {
        ranked.get_mut(pos).sort_by(|a, b| {
            b.value_for_money(floor)
                .total_cmp(&a.value_for_money(floor))
                .then(b.ep.total_cmp(&a.ep))
                .then(a.player_id.cmp(&b.player_id))
        });
        by_price.get_mut(pos).sort_by(|a, b| {
            a.price
                .total_cmp(&b.price)
                .then(a.player_id.cmp(&b.player_id))
        });
    }

    let mut state = DraftState {
        chosen: HashSet::new(),
        picked: Vec::with_capacity(rules.squad_size()),
        clubs: HashMap::new(),
        remaining: budget,
        open: rules.quotas,
        by_price,
        max_per_club,
    };

    for pos in draft_rounds(rules) {
        let best = ranked
            .at(pos)
            .iter()
            .copied()
            .find(|c| state.available(c) && state.fits(c));

        let pick = best.or_else(|| {
            let cheap = state.by_price.at(pos);
            let viable = cheap
                .iter()
                .copied()
                .find(|c| state.available(c) && state.fits(c))
                .or_else(|| {
                    cheap
                        .iter()
                        .copied()
                        .find(|c| state.available(c) && c.price <= state.remaining + BUDGET_EPS)
                });
            if let Some(c) = viable {
                debug!(
                    position = %pos,
                    player = c.player_id,
                    price = c.price,
                    remaining = state.remaining,
                    "cheapest-viable fallback"
                );
            }
            viable
        });

        match pick {
            Some(c) => state.take(c),
            None => debug!(position = %pos, remaining = state.remaining, "no viable candidate"),
        }
    }

    let size = rules.squad_size();
    if state.picked.len() == size {
        debug!(cost = budget - state.remaining, "squad complete");
        SquadOutcome::Complete(state.picked)
    } else {
        let unfilled = size - state.picked.len();
        warn!(budget, unfilled, "squad incomplete");
        SquadOutcome::Incomplete {
            picked: state.picked,
            unfilled,
        }
    }
}

/// Squad build ranked on the configured objective horizon.
pub fn solve_for_objective(
    players: &[Player],
    table: &ProjectionTable,
    budget: f64,
    rules: &SquadRules,
) -> SquadOutcome {
    let candidates = candidates_from(players, table, rules.objective_horizon);
    solve_squad(&candidates, budget, rules.max_per_club, rules)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Chip {
    /// One-week rebuild: next round only, at the default budget.
    FreeHit,
    /// Permanent rebuild on the objective horizon at the manager's budget.
    Wildcard,
}

impl Chip {
    pub fn horizon(self, rules: &SquadRules) -> u8 {
        match self {
            Chip::FreeHit => 1,
            Chip::Wildcard => rules.objective_horizon,
        }
    }

    pub fn budget(self, rules: &SquadRules, manager_budget: f64) -> f64 {
        match self {
            Chip::FreeHit => rules.default_budget,
            Chip::Wildcard => manager_budget,
        }
    }
}

pub fn solve_chip(
    chip: Chip,
    players: &[Player],
    table: &ProjectionTable,
    manager_budget: f64,
    rules: &SquadRules,
) -> SquadOutcome {
    let candidates = candidates_from(players, table, chip.horizon(rules));
    solve_squad(
        &candidates,
        chip.budget(rules, manager_budget),
        rules.max_per_club,
        rules,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(id: u32, position: Position, club_id: u32, price: f64, ep: f64) -> Candidate {
        Candidate {
            player_id: id,
            position,
            club_id,
            price,
            ep,
        }
    }

    #[test]
    fn draft_rounds_cover_quotas_exactly() {
        let rules = SquadRules::default();
        let rounds = draft_rounds(&rules);
        assert_eq!(rounds.len(), 15);
        assert_eq!(rounds[0], Position::Goalkeeper);
        assert_eq!(rounds[5], Position::Forward);
        for pos in Position::ALL {
            assert_eq!(rounds.iter().filter(|p| **p == pos).count(), rules.quotas.get(pos));
        }
        // The interleaved order places 14; the fifth defender is topped up last.
        assert_eq!(rounds[14], Position::Defender);
    }

    #[test]
    fn value_for_money_uses_price_floor() {
        let c = cand(1, Position::Forward, 1, 0.0, 2.0);
        assert!((c.value_for_money(0.1) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn greedy_prefers_value_then_ep() {
        let rules = SquadRules {
            quotas: PerPosition::new(1, 0, 0, 0),
            ..SquadRules::default()
        };
        let pool = vec![
            cand(1, Position::Goalkeeper, 1, 5.0, 5.0),
            cand(2, Position::Goalkeeper, 2, 4.0, 4.0),
            cand(3, Position::Goalkeeper, 3, 4.0, 3.0),
        ];
        // 1 and 2 tie on value; 1 has more EP.
        assert_eq!(solve_squad(&pool, 10.0, 3, &rules), SquadOutcome::Complete(vec![1]));
        // Only the 4.0 keepers fit.
        assert_eq!(solve_squad(&pool, 4.5, 3, &rules), SquadOutcome::Complete(vec![2]));
    }

    #[test]
    fn infeasible_budget_reports_unfilled() {
        let rules = SquadRules {
            quotas: PerPosition::new(2, 0, 0, 0),
            ..SquadRules::default()
        };
        let pool = vec![
            cand(1, Position::Goalkeeper, 1, 5.0, 5.0),
            cand(2, Position::Goalkeeper, 2, 5.0, 4.0),
        ];
        match solve_squad(&pool, 7.0, 3, &rules) {
            SquadOutcome::Incomplete { picked, unfilled } => {
                assert_eq!(picked, vec![1]);
                assert_eq!(unfilled, 1);
            }
            other => panic!("expected incomplete, got {other:?}"),
        }
    }

    #[test]
    fn reserve_keeps_room_for_open_slots() {
        let rules = SquadRules {
            quotas: PerPosition::new(1, 1, 0, 0),
            draft_order: vec![Position::Goalkeeper, Position::Defender],
            ..SquadRules::default()
        };
        // The premium keeper has the best value but would leave nothing for a defender.
        let pool = vec![
            cand(1, Position::Goalkeeper, 1, 6.0, 12.0),
            cand(2, Position::Goalkeeper, 2, 4.0, 4.0),
            cand(3, Position::Defender, 3, 4.0, 4.0),
        ];
        let out = solve_squad(&pool, 8.0, 3, &rules);
        assert_eq!(out, SquadOutcome::Complete(vec![2, 3]));
    }

    #[test]
    fn club_cap_is_respected() {
        let rules = SquadRules {
            quotas: PerPosition::new(0, 0, 0, 3),
            draft_order: Vec::new(),
            ..SquadRules::default()
        };
        let pool = vec![
            cand(1, Position::Forward, 1, 5.0, 9.0),
            cand(2, Position::Forward, 1, 5.0, 8.0),
            cand(3, Position::Forward, 2, 5.0, 1.0),
        ];
        let out = solve_squad(&pool, 100.0, 2, &rules);
        assert_eq!(out, SquadOutcome::Complete(vec![1, 2, 3]));
        let out = solve_squad(&pool, 100.0, 1, &rules);
        assert!(!out.is_complete());
        assert_eq!(out.ids(), &[1, 3]);
    }

    #[test]
    fn chips_pick_horizon_and_budget() {
        let rules = SquadRules::default();
        assert_eq!(Chip::FreeHit.horizon(&rules), 1);
        assert_eq!(Chip::Wildcard.horizon(&rules), 3);
        assert_eq!(Chip::FreeHit.budget(&rules, 104.5), 100.0);
        assert_eq!(Chip::Wildcard.budget(&rules, 104.5), 104.5);
    }
}
