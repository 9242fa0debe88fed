use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};
use crate::model::{PerPosition, Position};

/// Closed interval used by the linear form/selection maps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub lo: f64,
    pub hi: f64,
}

impl Band {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Maps `t` in [0,1] onto the band; `t` is clamped first.
    pub fn lerp(&self, t: f64) -> f64 {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        self.lo + (self.hi - self.lo) * t
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub appearance: f64,
    pub goal: PerPosition<f64>,
    pub assist: PerPosition<f64>,
    pub clean_sheet: PerPosition<f64>,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            appearance: 2.0,
            goal: PerPosition::new(0.0, 6.0, 5.0, 4.0),
            assist: PerPosition::splat(3.0),
            clean_sheet: PerPosition::new(4.0, 4.0, 1.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinutesModel {
    pub baseline: PerPosition<f64>,
    pub form_band: Band,
    pub form_scale_max: f64,
    pub selection_band: Band,
    pub selection_scale_max: f64,
    // Cap the position baseline by the share of available minutes actually played.
    pub use_history: bool,
}

impl Default for MinutesModel {
    fn default() -> Self {
        Self {
            baseline: PerPosition::new(90.0, 85.0, 78.0, 78.0),
            form_band: Band::new(0.9, 1.1),
            form_scale_max: 12.0,
            selection_band: Band::new(0.98, 1.02),
            selection_scale_max: 60.0,
            use_history: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrengthBlend {
    pub league_mean: f64,
    // Weight of the defence-ratio term; the difficulty-ease term gets the rest.
    pub defence_weight: f64,
    pub ease_easiest: f64,
    pub ease_hardest: f64,
    pub cs_intercept: f64,
    pub cs_slope: f64,
    pub cs_ease_nudge: f64,
}

impl Default for StrengthBlend {
    fn default() -> Self {
        Self {
            league_mean: 3.0,
            defence_weight: 0.5,
            ease_easiest: 1.4,
            ease_hardest: 0.6,
            cs_intercept: -0.85,
            cs_slope: 0.9,
            cs_ease_nudge: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SquadRules {
    pub default_budget: f64,
    pub quotas: PerPosition<usize>,
    pub max_per_club: usize,
    pub draft_order: Vec<Position>,
    pub objective_horizon: u8,
    pub lineup_min: PerPosition<usize>,
    pub xi_size: usize,
    pub transfer_hit: f64,
    pub price_floor: f64,
}

impl SquadRules {
    pub fn squad_size(&self) -> usize {
        self.quotas.total()
    }
}

impl Default for SquadRules {
    fn default() -> Self {
        use Position::*;
        Self {
            default_budget: 100.0,
            quotas: PerPosition::new(2, 5, 5, 3),
            max_per_club: 3,
            draft_order: vec![
                Goalkeeper, Defender, Defender, Midfielder, Midfielder, Forward, Defender,
                Midfielder, Forward, Defender, Midfielder, Forward, Goalkeeper, Midfielder,
            ],
            objective_horizon: 3,
            lineup_min: PerPosition::new(1, 3, 2, 1),
            xi_size: 11,
            transfer_hit: 4.0,
            price_floor: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentRules {
    pub min_minutes: f64,
    pub fuzzy_cutoff: f64,
}

impl Default for EnrichmentRules {
    fn default() -> Self {
        Self {
            min_minutes: 180.0,
            fuzzy_cutoff: 0.92,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub horizons: Vec<u8>,
    pub scoring: ScoringWeights,
    pub minutes: MinutesModel,
    pub strength: StrengthBlend,
    pub squad: SquadRules,
    pub enrichment: EnrichmentRules,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            horizons: vec![1, 3, 5],
            scoring: ScoringWeights::default(),
            minutes: MinutesModel::default(),
            strength: StrengthBlend::default(),
            squad: SquadRules::default(),
            enrichment: EnrichmentRules::default(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> AnyResult<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read engine config {}", path.display()))?;
        let cfg = serde_json::from_str::<EngineConfig>(&raw)
            .with_context(|| format!("parse engine config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `FPL_PLANNER_CONFIG` points at a JSON file; `FPL_BUDGET` and
    /// `FPL_MAX_PER_CLUB` override single values on top of it.
    pub fn from_env() -> AnyResult<Self> {
        let mut cfg = match env::var("FPL_PLANNER_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::load(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        if let Some(budget) = env::var("FPL_BUDGET")
            .ok()
            .and_then(|v| v.trim().parse::<f64>().ok())
        {
            cfg.squad.default_budget = budget.clamp(50.0, 200.0);
        }
        if let Some(cap) = env::var("FPL_MAX_PER_CLUB")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            cfg.squad.max_per_club = cap.clamp(1, 15);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizons.is_empty() || self.horizons.contains(&0) {
            return Err(PlannerError::Config(
                "horizons must be a non-empty list of positive round counts".to_string(),
            ));
        }
        let rules = &self.squad;
        if rules.squad_size() == 0 || rules.xi_size == 0 || rules.xi_size > rules.squad_size() {
            return Err(PlannerError::Config(format!(
                "xi size {} does not fit squad size {}",
                rules.xi_size,
                rules.squad_size()
            )));
        }
        for pos in Position::ALL {
            if rules.lineup_min.get(pos) > rules.quotas.get(pos) {
                return Err(PlannerError::Config(format!(
                    "lineup minimum for {pos} exceeds its squad quota"
                )));
            }
        }
        if rules.lineup_min.total() > rules.xi_size {
            return Err(PlannerError::Config(
                "lineup minimums exceed the xi size".to_string(),
            ));
        }
        if rules.max_per_club == 0 {
            return Err(PlannerError::Config("max_per_club must be positive".to_string()));
        }
        if rules.price_floor <= 0.0 || !rules.default_budget.is_finite() {
            return Err(PlannerError::Config(
                "price floor must be positive and budget finite".to_string(),
            ));
        }
        let w = &self.scoring;
        let negative = w.appearance < 0.0
            || Position::ALL.iter().any(|p| {
                w.goal.get(*p) < 0.0 || w.assist.get(*p) < 0.0 || w.clean_sheet.get(*p) < 0.0
            });
        if negative {
            return Err(PlannerError::Config("scoring weights must be non-negative".to_string()));
        }
        if !(0.0..=1.0).contains(&self.strength.defence_weight) {
            return Err(PlannerError::Config(
                "defence_weight must lie in [0,1]".to_string(),
            ));
        }
        if self.strength.league_mean <= 0.0 {
            return Err(PlannerError::Config("league_mean must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
        assert_eq!(SquadRules::default().squad_size(), 15);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"squad":{"max_per_club":2},"horizons":[1,2]}"#).unwrap();
        assert_eq!(cfg.squad.max_per_club, 2);
        assert_eq!(cfg.squad.quotas.def, 5);
        assert_eq!(cfg.horizons, vec![1, 2]);
        assert_eq!(cfg.scoring.goal.def, 6.0);
    }

    #[test]
    fn rejects_zero_horizon_and_bad_blend() {
        let mut cfg = EngineConfig::default();
        cfg.horizons = vec![0];
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.strength.defence_weight = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn band_lerp_clamps() {
        let b = Band::new(0.9, 1.1);
        assert!((b.lerp(-1.0) - 0.9).abs() < 1e-12);
        assert!((b.lerp(0.5) - 1.0).abs() < 1e-12);
        assert!((b.lerp(3.0) - 1.1).abs() < 1e-12);
        assert!((b.lerp(f64::NAN) - 0.9).abs() < 1e-12);
    }
}
