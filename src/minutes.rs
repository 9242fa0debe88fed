use serde::Serialize;

use crate::config::MinutesModel;
use crate::model::Player;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MinutesEstimate {
    pub fixture_count: u32,
    pub per_fixture: f64,
    pub total: f64,
    pub availability: f64,
}

impl MinutesEstimate {
    pub fn blank() -> Self {
        Self {
            fixture_count: 0,
            per_fixture: 0.0,
            total: 0.0,
            availability: 0.0,
        }
    }
}

/// `chance / 100` clamped to [0,1]; no published chance means fully available.
pub fn availability_factor(chance_of_playing: Option<f64>) -> f64 {
    match chance_of_playing {
        Some(c) if c.is_finite() => (c / 100.0).clamp(0.0, 1.0),
        _ => 1.0,
    }
}

pub fn form_factor(form: f64, model: &MinutesModel) -> f64 {
    model.form_band.lerp(form / model.form_scale_max.max(1e-9))
}

pub fn selection_factor(selected_by_percent: f64, model: &MinutesModel) -> f64 {
    model
        .selection_band
        .lerp(selected_by_percent / model.selection_scale_max.max(1e-9))
}

/// Position baseline, capped by `90 x share of available minutes played`
/// once the season has completed rounds.
pub fn baseline_minutes(player: &Player, completed_rounds: u32, model: &MinutesModel) -> f64 {
    let base = model.baseline.get(player.position);
    if !model.use_history || completed_rounds == 0 {
        return base;
    }
    let share = (player.minutes / (completed_rounds as f64 * 90.0)).clamp(0.0, 1.0);
    base.min(90.0 * share)
}

pub fn expected_minutes(
    player: &Player,
    fixture_count: u32,
    completed_rounds: u32,
    model: &MinutesModel,
) -> MinutesEstimate {
    // Blank gameweek: hard zero, nothing else is consulted.
    if fixture_count == 0 {
        return MinutesEstimate::blank();
    }

    let base = baseline_minutes(player, completed_rounds, model);
    let availability = availability_factor(player.chance_of_playing);
    let per_fixture = base
        * availability
        * form_factor(player.form, model)
        * selection_factor(player.selected_by_percent, model);
    MinutesEstimate {
        fixture_count,
        per_fixture,
        total: fixture_count as f64 * per_fixture,
        availability,
    }
}
