use serde::Serialize;

use crate::model::{Player, Position};
use crate::projection::ProjectionTable;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptainOption {
    pub player_id: u32,
    pub name: String,
    pub club: String,
    pub position: Position,
    pub fixture_count: u32,
    pub ep: f64,
    /// Upside proxy: `(xG/90 + xA/90) x attack multiplier`.
    pub ceiling: f64,
}

/// Midfielders and forwards ranked for the armband: EP first, ceiling to
/// break ties. Players with no fixture in the horizon are left out.
pub fn captaincy_board<'a>(
    players: impl IntoIterator<Item = &'a Player>,
    table: &ProjectionTable,
    horizon: u8,
    limit: usize,
) -> Vec<CaptainOption> {
    let mut out: Vec<CaptainOption> = players
        .into_iter()
        .filter(|p| matches!(p.position, Position::Midfielder | Position::Forward))
        .filter_map(|p| {
            let row = table.get(p.id, horizon)?;
            (row.fixture_count > 0).then(|| CaptainOption {
                player_id: p.id,
                name: p.name.clone(),
                club: p.club.clone(),
                position: p.position,
                fixture_count: row.fixture_count,
                ep: row.ep_total,
                ceiling: (p.xg_per90 + p.xa_per90) * row.attack_multiplier,
            })
        })
        .collect();
    out.sort_by(|a, b| {
        b.ep.total_cmp(&a.ep)
            .then(b.ceiling.total_cmp(&a.ceiling))
            .then(a.player_id.cmp(&b.player_id))
    });
    out.truncate(limit);
    out
}
