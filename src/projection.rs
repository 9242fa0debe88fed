use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EngineConfig, StrengthBlend};
use crate::error::{PlannerError, Result};
use crate::fixtures::{ClubFixture, FixtureWindow, club_schedule};
use crate::minutes::{MinutesEstimate, expected_minutes};
use crate::model::{ClubStrength, Player, Position, SeasonData};

/// One player over one horizon. Always recomputable from the season tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    pub player_id: u32,
    pub horizon: u8,
    pub position: Position,
    pub club_id: u32,
    pub price: f64,
    pub fixture_count: u32,
    pub expected_minutes: f64,
    pub attack_multiplier: f64,
    // Summed across fixtures, so a double can exceed 1.0.
    pub clean_sheet_prob: f64,
    pub appearance_points: f64,
    pub attacking_points: f64,
    pub clean_sheet_points: f64,
    pub ep_total: f64,
    pub value_for_money: f64,
}

/// Published difficulty mapped linearly from 2..5 onto the ease band;
/// difficulty 1 is treated as 2.
pub fn difficulty_ease(difficulty: u8, blend: &StrengthBlend) -> f64 {
    let d = (difficulty as f64).clamp(2.0, 5.0);
    let t = (d - 2.0) / 3.0;
    blend.ease_easiest + (blend.ease_hardest - blend.ease_easiest) * t
}

pub fn attack_multiplier(
    opponent: ClubStrength,
    league_defence_mean: f64,
    difficulty: u8,
    blend: &StrengthBlend,
) -> f64 {
    let ratio = league_defence_mean / opponent.defence.max(1e-6);
    blend.defence_weight * ratio + (1.0 - blend.defence_weight) * difficulty_ease(difficulty, blend)
}

pub fn clean_sheet_probability(
    own: ClubStrength,
    opponent: ClubStrength,
    difficulty: u8,
    blend: &StrengthBlend,
) -> f64 {
    let x = blend.cs_intercept
        + blend.cs_slope * (own.defence - opponent.attack)
        + blend.cs_ease_nudge * (difficulty_ease(difficulty, blend) - 1.0);
    sigmoid(x)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Everything a single player's projection needs besides the player itself.
#[derive(Debug, Clone)]
pub struct StrengthContext {
    pub strengths: HashMap<u32, ClubStrength>,
    pub league_defence_mean: f64,
    pub completed_rounds: u32,
}

impl StrengthContext {
    pub fn from_season(season: &SeasonData, blend: &StrengthBlend) -> Self {
        let strengths = season.club_strengths();
        let league_defence_mean = if strengths.is_empty() {
            blend.league_mean
        } else {
            strengths.values().map(|s| s.defence).sum::<f64>() / strengths.len() as f64
        };
        Self {
            strengths,
            league_defence_mean,
            completed_rounds: season.completed_rounds,
        }
    }

    fn strength(&self, club_id: u32, blend: &StrengthBlend) -> ClubStrength {
        self.strengths
            .get(&club_id)
            .copied()
            .unwrap_or_else(|| ClubStrength::neutral(blend.league_mean))
    }
}

pub fn project_player(
    player: &Player,
    fixtures: &[ClubFixture],
    ctx: &StrengthContext,
    horizon: u8,
    cfg: &EngineConfig,
) -> ProjectionRow {
    let blend = &cfg.strength;
    let fixture_count = fixtures.len() as u32;
    let minutes = if fixture_count == 0 {
        MinutesEstimate::blank()
    } else {
        expected_minutes(player, fixture_count, ctx.completed_rounds, &cfg.minutes)
    };

    let own = ctx.strength(player.club_id, blend);
    let mut mult_sum = 0.0;
    let mut cs_sum = 0.0;
    for f in fixtures {
        let opp = ctx.strength(f.opponent, blend);
        mult_sum += attack_multiplier(opp, ctx.league_defence_mean, f.difficulty, blend);
        cs_sum += clean_sheet_probability(own, opp, f.difficulty, blend);
    }
    let attack_mult = if fixture_count > 0 {
        mult_sum / fixture_count as f64
    } else {
        0.0
    };

    let w = &cfg.scoring;
    let nineties = minutes.total / 90.0;
    let appearance_points = if fixture_count > 0 {
        w.appearance * fixture_count as f64
    } else {
        0.0
    };
    let attacking_points = nineties * player.xg_per90 * attack_mult * w.goal.get(player.position)
        + nineties * player.xa_per90 * attack_mult * w.assist.get(player.position);
    let clean_sheet_points = cs_sum * w.clean_sheet.get(player.position);

    let ep_total = round2(appearance_points + attacking_points + clean_sheet_points);
    ProjectionRow {
        player_id: player.id,
        horizon,
        position: player.position,
        club_id: player.club_id,
        price: player.price,
        fixture_count,
        expected_minutes: minutes.total,
        attack_multiplier: attack_mult,
        clean_sheet_prob: cs_sum,
        appearance_points,
        attacking_points,
        clean_sheet_points,
        ep_total,
        value_for_money: ep_total / player.price.max(cfg.squad.price_floor),
    }
}

/// Projects every player over the next `horizon` rounds from the season's
/// current round. Sorted by EP descending, then player id.
pub fn project_horizon(season: &SeasonData, horizon: u8, cfg: &EngineConfig) -> Result<Vec<ProjectionRow>> {
    if horizon == 0 {
        return Err(PlannerError::InvalidHorizon(horizon));
    }
    let window = FixtureWindow::new(season.current_round, horizon);
    let schedule = club_schedule(&season.fixtures, window);
    let ctx = StrengthContext::from_season(season, &cfg.strength);

    let mut rows: Vec<ProjectionRow> = season
        .players
        .iter()
        .map(|p| {
            let fixtures = schedule.get(&p.club_id).map(Vec::as_slice).unwrap_or(&[]);
            project_player(p, fixtures, &ctx, horizon, cfg)
        })
        .collect();
    rows.sort_by(|a, b| {
        b.ep_total
            .total_cmp(&a.ep_total)
            .then(a.player_id.cmp(&b.player_id))
    });
    debug!(horizon, rows = rows.len(), start = season.current_round, "projected horizon");
    Ok(rows)
}

/// Horizons are independent re-runs over different fixture windows, so they
/// are computed in parallel.
pub fn project_horizons(season: &SeasonData, horizons: &[u8], cfg: &EngineConfig) -> Result<ProjectionTable> {
    let mut horizons = horizons.to_vec();
    horizons.sort_unstable();
    horizons.dedup();
    let per_horizon = horizons
        .par_iter()
        .map(|h| project_horizon(season, *h, cfg))
        .collect::<Result<Vec<_>>>()?;
    Ok(ProjectionTable::from_rows(per_horizon.into_iter().flatten().collect()))
}

#[derive(Debug, Clone, Default)]
pub struct ProjectionTable {
    rows: Vec<ProjectionRow>,
    index: HashMap<(u32, u8), usize>,
    horizons: Vec<u8>,
}

impl ProjectionTable {
    pub fn from_rows(rows: Vec<ProjectionRow>) -> Self {
        let mut index = HashMap::with_capacity(rows.len());
        let mut horizons = Vec::new();
        for (i, r) in rows.iter().enumerate() {
            index.insert((r.player_id, r.horizon), i);
            if !horizons.contains(&r.horizon) {
                horizons.push(r.horizon);
            }
        }
        horizons.sort_unstable();
        Self {
            rows,
            index,
            horizons,
        }
    }

    pub fn rows(&self) -> &[ProjectionRow] {
        &self.rows
    }

    pub fn horizons(&self) -> &[u8] {
        &self.horizons
    }

    pub fn rows_for(&self, horizon: u8) -> impl Iterator<Item = &ProjectionRow> + '_ {
        self.rows.iter().filter(move |r| r.horizon == horizon)
    }

    pub fn get(&self, player_id: u32, horizon: u8) -> Option<&ProjectionRow> {
        self.index.get(&(player_id, horizon)).map(|i| &self.rows[*i])
    }

    /// EP for a player, 0.0 when the player or horizon was never projected.
    pub fn ep(&self, player_id: u32, horizon: u8) -> f64 {
        self.get(player_id, horizon).map(|r| r.ep_total).unwrap_or(0.0)
    }

    pub fn top_by_position(&self, position: Position, horizon: u8, n: usize) -> Vec<&ProjectionRow> {
        let mut rows: Vec<&ProjectionRow> = self
            .rows_for(horizon)
            .filter(|r| r.position == position)
            .collect();
        rows.sort_by(|a, b| {
            b.ep_total
                .total_cmp(&a.ep_total)
                .then(a.player_id.cmp(&b.player_id))
        });
        rows.truncate(n);
        rows
    }

    pub fn total_ep(&self, ids: &[u32], horizon: u8) -> f64 {
        round2(ids.iter().map(|id| self.ep(*id, horizon)).sum())
    }

    /// Planner view: summed EP of a set of players for each projected horizon.
    pub fn horizon_totals(&self, ids: &[u32]) -> Vec<(u8, f64)> {
        self.horizons
            .iter()
            .map(|h| (*h, self.total_ep(ids, *h)))
            .collect()
    }
}
