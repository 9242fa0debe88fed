use std::fmt;

use serde::Serialize;

use crate::config::SquadRules;
use crate::error::SquadError;
use crate::model::Position;
use crate::projection::ProjectionTable;
use crate::squad::{Squad, SquadSlot};

/// Outfield shape of a starting XI; the keeper is implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Formation {
    pub def: usize,
    pub mid: usize,
    pub fwd: usize,
}

impl Formation {
    pub const fn new(def: usize, mid: usize, fwd: usize) -> Self {
        Self { def, mid, fwd }
    }

    pub fn count(&self, position: Position) -> usize {
        match position {
            Position::Goalkeeper => 1,
            Position::Defender => self.def,
            Position::Midfielder => self.mid,
            Position::Forward => self.fwd,
        }
    }
}

impl fmt::Display for Formation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.def, self.mid, self.fwd)
    }
}

pub const VALID_FORMATIONS: [Formation; 7] = [
    Formation::new(3, 4, 3),
    Formation::new(3, 5, 2),
    Formation::new(4, 4, 2),
    Formation::new(4, 5, 1),
    Formation::new(4, 3, 3),
    Formation::new(5, 3, 2),
    Formation::new(5, 4, 1),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineupPick {
    /// Starters, highest EP first.
    pub xi: Vec<u32>,
    pub captain: u32,
    pub vice: u32,
    /// Goalkeeper first, then outfield by EP.
    pub bench: Vec<u32>,
    pub formation: Formation,
    pub xi_ep: f64,
}

fn by_ep_desc(slots: &mut [&SquadSlot], table: &ProjectionTable, horizon: u8) {
    slots.sort_by(|a, b| {
        table
            .ep(b.player_id, horizon)
            .total_cmp(&table.ep(a.player_id, horizon))
            .then(a.player_id.cmp(&b.player_id))
    });
}

fn ranked<'s>(
    squad: &'s Squad,
    position: Position,
    table: &ProjectionTable,
    horizon: u8,
) -> Vec<&'s SquadSlot> {
    let mut out: Vec<&SquadSlot> = squad.slots().iter().filter(|s| s.position == position).collect();
    by_ep_desc(&mut out, table, horizon);
    out
}

fn finish(
    squad: &Squad,
    mut xi: Vec<&SquadSlot>,
    table: &ProjectionTable,
    horizon: u8,
) -> Result<LineupPick, SquadError> {
    by_ep_desc(&mut xi, table, horizon);
    let (captain, vice) = match xi.as_slice() {
        [] => {
            return Err(SquadError::NotLegal {
                reason: "no starters could be selected".to_string(),
            });
        }
        [only] => (only.player_id, only.player_id),
        [first, second, ..] => (first.player_id, second.player_id),
    };

    let mut keepers: Vec<&SquadSlot> = Vec::new();
    let mut outfield: Vec<&SquadSlot> = Vec::new();
    for s in squad.slots() {
        if xi.iter().any(|x| x.player_id == s.player_id) {
            continue;
        }
        if s.position == Position::Goalkeeper {
            keepers.push(s);
        } else {
            outfield.push(s);
        }
    }
    by_ep_desc(&mut keepers, table, horizon);
    by_ep_desc(&mut outfield, table, horizon);

    let count = |pos: Position| xi.iter().filter(|s| s.position == pos).count();
    let formation = Formation::new(
        count(Position::Defender),
        count(Position::Midfielder),
        count(Position::Forward),
    );
    let ids: Vec<u32> = xi.iter().map(|s| s.player_id).collect();
    Ok(LineupPick {
        xi_ep: table.total_ep(&ids, horizon),
        xi: ids,
        captain,
        vice,
        bench: keepers.iter().chain(&outfield).map(|s| s.player_id).collect(),
        formation,
    })
}

/// Minimum shape first (1 GK, then the outfield minimums), remaining places
/// from the best outfield players regardless of position. Captain and vice are
/// the two highest-EP starters.
pub fn choose_starting_xi(
    squad: &Squad,
    table: &ProjectionTable,
    horizon: u8,
    rules: &SquadRules,
) -> Result<LineupPick, SquadError> {
    squad.require_legal()?;

    let mut xi: Vec<&SquadSlot> = Vec::with_capacity(rules.xi_size);
    for pos in Position::ALL {
        let need = if pos == Position::Goalkeeper {
            1
        } else {
            rules.lineup_min.get(pos)
        };
        xi.extend(ranked(squad, pos, table, horizon).into_iter().take(need));
    }

    let mut rest: Vec<&SquadSlot> = squad
        .slots()
        .iter()
        .filter(|s| s.position != Position::Goalkeeper)
        .filter(|s| !xi.iter().any(|x| x.player_id == s.player_id))
        .collect();
    by_ep_desc(&mut rest, table, horizon);
    let open = rules.xi_size.saturating_sub(xi.len());
    xi.extend(rest.into_iter().take(open));

    finish(squad, xi, table, horizon)
}

/// Tries every listed formation the squad can field and keeps the one with
/// the highest summed EP. Ties go to the earlier formation.
pub fn best_formation_xi(
    squad: &Squad,
    table: &ProjectionTable,
    horizon: u8,
) -> Result<LineupPick, SquadError> {
    squad.require_legal()?;

    let pools: Vec<(Position, Vec<&SquadSlot>)> = Position::ALL
        .iter()
        .map(|p| (*p, ranked(squad, *p, table, horizon)))
        .collect();

    let mut best: Option<(f64, Vec<&SquadSlot>)> = None;
    for formation in VALID_FORMATIONS {
        let fits = pools.iter().all(|(pos, pool)| pool.len() >= formation.count(*pos));
        if !fits {
            continue;
        }
        let xi: Vec<&SquadSlot> = pools
            .iter()
            .flat_map(|(pos, pool)| pool.iter().copied().take(formation.count(*pos)))
            .collect();
        let total: f64 = xi.iter().map(|s| table.ep(s.player_id, horizon)).sum();
        if best.as_ref().is_none_or(|(b, _)| total > *b + 1e-12) {
            best = Some((total, xi));
        }
    }

    let Some((_, xi)) = best else {
        return Err(SquadError::NotLegal {
            reason: "squad cannot field any listed formation".to_string(),
        });
    };
    finish(squad, xi, table, horizon)
}
