use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strsim::jaro_winkler;
use tracing::{info, warn};

use crate::config::EnrichmentRules;
use crate::model::Player;
use crate::normalize::{id_field, num_field, str_field};

const PROVIDER_ID: &[&str] = &["fpl_id", "element", "fantasy_id"];
const PROVIDER_NAME: &[&str] = &["player_name", "PLAYER_NAME", "Player", "player", "fpl_name", "name"];
const PROVIDER_TEAM: &[&str] = &["team_title", "TEAM_TITLE", "team_name", "Squad", "squad"];
const PROVIDER_MINUTES: &[&str] = &["minutes", "time", "TIME", "Min", "min"];
const PROVIDER_XG: &[&str] = &["xg", "xG", "Expected_xG"];
const PROVIDER_XA: &[&str] = &["xa", "xA", "xag", "Expected_xAG"];
const PROVIDER_XG90: &[&str] = &["xg_per90"];
const PROVIDER_XA90: &[&str] = &["xa_per90"];

/// One season-total row from an xG/xA provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRow {
    #[serde(default)]
    pub fantasy_id: Option<u32>,
    pub player_name: String,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub minutes: f64,
    #[serde(default)]
    pub xg: f64,
    #[serde(default)]
    pub xa: f64,
    // Some sources publish rates directly instead of season totals.
    #[serde(default)]
    pub xg_per90: Option<f64>,
    #[serde(default)]
    pub xa_per90: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RateRow {
    pub fantasy_id: Option<u32>,
    pub name_norm: String,
    pub team_norm: String,
    pub xg_per90: f64,
    pub xa_per90: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    pub source_rows: usize,
    pub matched_by_id: usize,
    pub matched_by_name: usize,
    pub matched_fuzzy: usize,
    pub unmatched: usize,
    pub degraded: bool,
}

/// Accepts either a list of rows or an object keyed by provider id.
pub fn provider_rows_from_json(v: &Value) -> Vec<ProviderRow> {
    let rows: Vec<&Value> = match v {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get("players").and_then(Value::as_array) {
            Some(items) => items.iter().collect(),
            None => map.values().collect(),
        },
        _ => Vec::new(),
    };
    rows.into_iter()
        .filter_map(|row| {
            let player_name = str_field(row, PROVIDER_NAME)?.to_string();
            Some(ProviderRow {
                fantasy_id: id_field(row, PROVIDER_ID),
                player_name,
                team_name: str_field(row, PROVIDER_TEAM).unwrap_or_default().to_string(),
                minutes: num_field(row, PROVIDER_MINUTES).unwrap_or(0.0),
                xg: num_field(row, PROVIDER_XG).unwrap_or(0.0),
                xa: num_field(row, PROVIDER_XA).unwrap_or(0.0),
                xg_per90: num_field(row, PROVIDER_XG90),
                xa_per90: num_field(row, PROVIDER_XA90),
            })
        })
        .collect()
}

/// Per-90 rates; rows under `min_minutes` are dropped unless they already
/// carry rates. Non-finite results become 0.0.
pub fn compute_rates(rows: &[ProviderRow], min_minutes: f64) -> Vec<RateRow> {
    rows.iter()
        .filter_map(|r| {
            let has_rates = r.xg_per90.is_some() || r.xa_per90.is_some();
            if !has_rates && r.minutes < min_minutes {
                return None;
            }
            let nineties = r.minutes / 90.0;
            let rate = |total: f64, direct: Option<f64>| {
                let v = direct.unwrap_or(if nineties > 0.0 { total / nineties } else { 0.0 });
                if v.is_finite() { v.max(0.0) } else { 0.0 }
            };
            Some(RateRow {
                fantasy_id: r.fantasy_id,
                name_norm: normalize_name(&r.player_name),
                team_norm: normalize_name(&r.team_name),
                xg_per90: rate(r.xg, r.xg_per90),
                xa_per90: rate(r.xa, r.xa_per90),
            })
        })
        .collect()
}

/// Fills `xg_per90`/`xa_per90` on every player. A missing or empty source
/// leaves all rates at 0.0 and is reported as degraded, never as an error.
pub fn apply_rates(
    players: &mut [Player],
    source: Option<&[ProviderRow]>,
    rules: &EnrichmentRules,
    notes: &mut Vec<String>,
) -> EnrichmentSummary {
    for p in players.iter_mut() {
        p.xg_per90 = 0.0;
        p.xa_per90 = 0.0;
    }

    let rows = match source {
        Some(rows) if !rows.is_empty() => rows,
        _ => {
            warn!("xG/xA source unavailable; attacking rates default to 0.0");
            notes.push("[WARN] xG/xA source unavailable, attacking rates set to 0.0".to_string());
            return EnrichmentSummary {
                unmatched: players.len(),
                degraded: true,
                ..Default::default()
            };
        }
    };

    let rates = compute_rates(rows, rules.min_minutes);
    let mut summary = EnrichmentSummary {
        source_rows: rows.len(),
        ..Default::default()
    };

    let by_id: HashMap<u32, &RateRow> = rates
        .iter()
        .filter_map(|r| r.fantasy_id.map(|id| (id, r)))
        .collect();
    let mut by_name: HashMap<&str, &RateRow> = HashMap::new();
    for r in &rates {
        by_name.entry(r.name_norm.as_str()).or_insert(r);
    }

    for p in players.iter_mut() {
        let full_norm = normalize_name(&p.full_name);
        let short_norm = normalize_name(&p.name);
        let club_norm = normalize_name(&p.club);

        let hit = if let Some(r) = by_id.get(&p.id) {
            summary.matched_by_id += 1;
            Some(*r)
        } else if let Some(r) = by_name
            .get(full_norm.as_str())
            .or_else(|| by_name.get(short_norm.as_str()))
        {
            summary.matched_by_name += 1;
            Some(*r)
        } else if let Some(r) = fuzzy_match(&full_norm, &club_norm, &rates, rules.fuzzy_cutoff) {
            summary.matched_fuzzy += 1;
            Some(r)
        } else {
            summary.unmatched += 1;
            None
        };

        if let Some(r) = hit {
            p.xg_per90 = r.xg_per90;
            p.xa_per90 = r.xa_per90;
        }
    }

    info!(
        by_id = summary.matched_by_id,
        by_name = summary.matched_by_name,
        fuzzy = summary.matched_fuzzy,
        unmatched = summary.unmatched,
        "xG/xA enrichment applied"
    );
    notes.push(format!(
        "[INFO] xG/xA matched {} players ({} fuzzy), {} unmatched",
        summary.matched_by_id + summary.matched_by_name + summary.matched_fuzzy,
        summary.matched_fuzzy,
        summary.unmatched
    ));
    summary
}

fn fuzzy_match<'a>(
    name_norm: &str,
    club_norm: &str,
    rates: &'a [RateRow],
    cutoff: f64,
) -> Option<&'a RateRow> {
    if name_norm.is_empty() {
        return None;
    }
    // Club names differ between providers; only narrow by club when it matches somewhere.
    let same_club = rates.iter().any(|r| !club_norm.is_empty() && r.team_norm == club_norm);
    rates
        .iter()
        .filter(|r| !same_club || r.team_norm == club_norm)
        .map(|r| (jaro_winkler(name_norm, &r.name_norm), r))
        .filter(|(score, _)| *score >= cutoff)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, r)| r)
}

pub fn normalize_name(input: &str) -> String {
    let lower = input.trim().to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut prev_us = false;
    for ch in lower.chars() {
        let mapped = if ch.is_alphanumeric() {
            Some(fold_accent(ch))
        } else if ch == '&' {
            Some('a')
        } else if ch == '.' || ch == '\'' {
            // "N. Surname" and "O'Name" collapse without a separator.
            continue;
        } else {
            None
        };

        if let Some(c) = mapped {
            out.push(c);
            prev_us = false;
        } else if !prev_us && !out.is_empty() {
            out.push('_');
            prev_us = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

fn fold_accent(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        _ => ch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;
    use serde_json::json;

    fn player(id: u32, name: &str, full: &str, club: &str) -> Player {
        Player {
            id,
            name: name.to_string(),
            full_name: full.to_string(),
            club_id: 1,
            club: club.to_string(),
            position: Position::Midfielder,
            price: 6.0,
            chance_of_playing: None,
            minutes: 900.0,
            xg_per90: 9.9,
            xa_per90: 9.9,
            form: 0.0,
            selected_by_percent: 0.0,
        }
    }

    #[test]
    fn normalize_name_compacts_and_folds() {
        assert_eq!(normalize_name(" Man City "), "man_city");
        assert_eq!(normalize_name("Martin Ødegaard"), "martin_odegaard");
        assert_eq!(normalize_name("Raúl Jiménez"), "raul_jimenez");
        assert_eq!(normalize_name("N. O'Brien-Smith"), "n_obrien_smith");
    }

    #[test]
    fn rates_respect_min_minutes() {
        let rows = vec![
            ProviderRow {
                fantasy_id: None,
                player_name: "A".into(),
                team_name: String::new(),
                minutes: 900.0,
                xg: 5.0,
                xa: 2.0,
                xg_per90: None,
                xa_per90: None,
            },
            ProviderRow {
                fantasy_id: None,
                player_name: "B".into(),
                team_name: String::new(),
                minutes: 90.0,
                xg: 1.0,
                xa: 0.0,
                xg_per90: None,
                xa_per90: None,
            },
        ];
        let rates = compute_rates(&rows, 180.0);
        assert_eq!(rates.len(), 1);
        assert!((rates[0].xg_per90 - 0.5).abs() < 1e-12);
        assert!((rates[0].xa_per90 - 0.2).abs() < 1e-12);
    }

    #[test]
    fn missing_source_degrades_to_zero() {
        let mut players = vec![player(1, "Saka", "Bukayo Saka", "Arsenal")];
        let mut notes = Vec::new();
        let summary = apply_rates(&mut players, None, &EnrichmentRules::default(), &mut notes);
        assert!(summary.degraded);
        assert_eq!(players[0].xg_per90, 0.0);
        assert_eq!(players[0].xa_per90, 0.0);
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn matches_by_id_then_name_then_fuzzy() {
        let raw = json!([
            {"fpl_id": 1, "player_name": "Someone Else", "minutes": 900, "xG": 9.0, "xA": 0.0},
            {"player_name": "Bukayo Saka", "team_title": "Arsenal", "time": 900, "xG": 4.5, "xA": 3.6},
            {"player_name": "Gabriel Martinelli Silva", "team_title": "Arsenal", "time": 1800, "xG": 6.0, "xA": 2.0}
        ]);
        let rows = provider_rows_from_json(&raw);
        assert_eq!(rows.len(), 3);

        let mut players = vec![
            player(1, "Haaland", "Erling Haaland", "Man City"),
            player(2, "Saka", "Bukayo Saka", "Arsenal"),
            player(3, "Martinelli", "Gabriel Martinelli Silva.", "Arsenal"),
            player(4, "Nobody", "Totally Unknown", "Arsenal"),
        ];
        let mut notes = Vec::new();
        let summary = apply_rates(&mut players, Some(&rows), &EnrichmentRules::default(), &mut notes);

        assert_eq!(summary.matched_by_id, 1);
        assert!((players[0].xg_per90 - 0.9).abs() < 1e-9);
        assert!((players[1].xg_per90 - 0.45).abs() < 1e-9);
        assert!((players[2].xg_per90 - 0.3).abs() < 1e-9);
        assert_eq!(players[3].xg_per90, 0.0);
        assert_eq!(summary.unmatched, 1);
    }

    #[test]
    fn object_keyed_payload_is_accepted() {
        let raw = json!({
            "101": {"player_name": "A", "time": "450", "xG": "1.5", "xA": "0.5"},
            "102": {"PLAYER_NAME": "B", "TIME": 900, "xg": 2.0, "xa": 1.0}
        });
        let rows = provider_rows_from_json(&raw);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.player_name == "B" && r.minutes == 900.0));
    }
}
