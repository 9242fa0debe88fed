use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::lineup::LineupPick;
use crate::normalize::{id_field, id_value, num_field};
use crate::optimizer::SquadOutcome;
use crate::transfers::TransferSuggestion;

/// The manager's saved selection. Where it is stored is up to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerState {
    pub budget: f64,
    pub bank: f64,
    pub free_transfers: u32,
    pub squad: Vec<u32>,
    pub starters: Vec<u32>,
    pub captain: Option<u32>,
    pub vice: Option<u32>,
}

impl Default for ManagerState {
    fn default() -> Self {
        Self {
            budget: 100.0,
            bank: 0.0,
            free_transfers: 1,
            squad: Vec::new(),
            starters: Vec::new(),
            captain: None,
            vice: None,
        }
    }
}

impl ManagerState {
    /// Lenient read: numeric strings are coerced, missing or unreadable
    /// fields keep their defaults, and an unreadable document yields the
    /// default state.
    pub fn from_json(raw: &str) -> Self {
        let Ok(v) = serde_json::from_str::<Value>(raw) else {
            warn!("manager state is not valid JSON; using defaults");
            return Self::default();
        };
        if !v.is_object() {
            warn!("manager state is not a JSON object; using defaults");
            return Self::default();
        }
        let base = Self::default();
        Self {
            budget: num_field(&v, &["budget"]).unwrap_or(base.budget),
            bank: num_field(&v, &["bank"]).unwrap_or(base.bank),
            free_transfers: num_field(&v, &["free_transfers"])
                .filter(|n| *n >= 0.0)
                .map(|n| n as u32)
                .unwrap_or(base.free_transfers),
            squad: id_list(&v, "squad"),
            starters: id_list(&v, "starters"),
            captain: id_field(&v, &["captain"]),
            vice: id_field(&v, &["vice"]),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn set_squad(&mut self, outcome: &SquadOutcome, bank: f64) {
        self.squad = outcome.ids().to_vec();
        self.bank = bank;
        self.starters.clear();
        self.captain = None;
        self.vice = None;
    }

    pub fn apply_lineup(&mut self, pick: &LineupPick) {
        self.starters = pick.xi.clone();
        self.captain = Some(pick.captain);
        self.vice = Some(pick.vice);
    }

    /// Records a made transfer: swaps the ids, moves money through the bank
    /// and uses a free transfer if one is left.
    pub fn record_transfer(&mut self, suggestion: &TransferSuggestion) {
        let TransferSuggestion::Swap {
            out_id,
            in_id,
            price_delta,
            ..
        } = suggestion
        else {
            return;
        };
        for list in [&mut self.squad, &mut self.starters] {
            for id in list.iter_mut().filter(|id| **id == *out_id) {
                *id = *in_id;
            }
        }
        for armband in [&mut self.captain, &mut self.vice] {
            if *armband == Some(*out_id) {
                *armband = Some(*in_id);
            }
        }
        self.bank -= price_delta;
        self.free_transfers = self.free_transfers.saturating_sub(1);
    }
}

fn id_list(v: &Value, key: &str) -> Vec<u32> {
    v.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(id_value).collect())
        .unwrap_or_default()
}
