use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::StrengthBlend;
use crate::error::Result;
use crate::model::{Club, ClubStrength, Fixture, Player, Position, SeasonData};

// Alternative source field names, highest priority first. Resolved here once;
// nothing downstream looks at raw field names again.
const PLAYER_ID: &[&str] = &["id", "element", "fpl_id", "player_id"];
const PLAYER_NAME: &[&str] = &["web_name", "name", "player_name", "second_name"];
const FIRST_NAME: &[&str] = &["first_name"];
const SECOND_NAME: &[&str] = &["second_name", "last_name"];
const PLAYER_CLUB: &[&str] = &["team", "team_id", "club_id", "club"];
const PLAYER_POSITION: &[&str] = &["element_type", "position", "pos"];
const PRICE_MINOR: &[&str] = &["now_cost", "cost"];
const PRICE_MAJOR: &[&str] = &["price", "price_m"];
const CHANCE: &[&str] = &["chance_of_playing_next_round", "chance_of_playing"];
const MINUTES: &[&str] = &["minutes", "total_minutes", "time"];
const FORM: &[&str] = &["form"];
const SELECTED: &[&str] = &["selected_by_percent", "selected_by", "ownership"];

const CLUB_ID: &[&str] = &["id", "team_id", "club_id"];
const CLUB_NAME: &[&str] = &["name", "team_name", "club"];
const CLUB_SHORT: &[&str] = &["short_name", "abbr"];
const ATTACK_HOME: &[&str] = &["strength_attack_home"];
const ATTACK_AWAY: &[&str] = &["strength_attack_away"];
const DEFENCE_HOME: &[&str] = &["strength_defence_home", "strength_defense_home"];
const DEFENCE_AWAY: &[&str] = &["strength_defence_away", "strength_defense_away"];
const ATTACK_RATING: &[&str] = &["attack", "attack_rating"];
const DEFENCE_RATING: &[&str] = &["defence", "defense", "defence_rating"];
const OVERALL: &[&str] = &["strength"];

const FIX_ROUND: &[&str] = &["event", "round", "gameweek"];
const FIX_HOME: &[&str] = &["team_h", "home", "home_id"];
const FIX_AWAY: &[&str] = &["team_a", "away", "away_id"];
const FIX_HOME_DIFF: &[&str] = &["team_h_difficulty", "home_difficulty"];
const FIX_AWAY_DIFF: &[&str] = &["team_a_difficulty", "away_difficulty"];

const DEFAULT_DIFFICULTY: u8 = 3;

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub players_read: usize,
    pub players_skipped: usize,
    pub clubs_read: usize,
    pub fixtures_read: usize,
    pub fixtures_skipped: usize,
    pub notes: Vec<String>,
}

impl IngestReport {
    pub fn push_note(&mut self, msg: impl Into<String>) {
        self.notes.push(msg.into());
    }
}

/// Raw strength inputs for one club before rescaling to the league mean.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawClubStrength {
    pub attack: Option<f64>,
    pub defence: Option<f64>,
    pub overall: Option<f64>,
}

pub fn parse_season_json(
    bootstrap_raw: &str,
    fixtures_raw: &str,
    blend: &StrengthBlend,
    now: DateTime<Utc>,
) -> Result<(SeasonData, IngestReport)> {
    let bootstrap: Value = serde_json::from_str(bootstrap_raw)?;
    let fixtures: Value = serde_json::from_str(fixtures_raw)?;
    Ok(normalize_season(&bootstrap, &fixtures, blend, now))
}

pub fn normalize_season(
    bootstrap: &Value,
    fixtures: &Value,
    blend: &StrengthBlend,
    now: DateTime<Utc>,
) -> (SeasonData, IngestReport) {
    let mut report = IngestReport::default();

    let clubs = normalize_clubs(array(bootstrap, "teams"), blend.league_mean, &mut report);
    let club_names: HashMap<u32, String> = clubs.iter().map(|c| (c.id, c.name.clone())).collect();

    let mut players = Vec::new();
    for row in array(bootstrap, "elements") {
        match normalize_player(row, &club_names) {
            Ok(p) => players.push(p),
            Err(reason) => {
                report.players_skipped += 1;
                warn!("skipping player row: {reason}");
                report.push_note(format!("[WARN] Skipped player row: {reason}"));
            }
        }
    }
    players.sort_by_key(|p| p.id);
    report.players_read = players.len();

    let fixture_rows = fixtures
        .as_array()
        .map(|a| a.as_slice())
        .unwrap_or_else(|| array(fixtures, "fixtures"));
    let mut out_fixtures = Vec::new();
    for row in fixture_rows {
        match normalize_fixture(row, &club_names) {
            Some(f) => out_fixtures.push(f),
            None => report.fixtures_skipped += 1,
        }
    }
    if report.fixtures_skipped > 0 {
        debug!(
            skipped = report.fixtures_skipped,
            "fixtures without a round or with unknown clubs were ignored"
        );
        report.push_note(format!(
            "[INFO] Ignored {} unscheduled or unknown-club fixtures",
            report.fixtures_skipped
        ));
    }
    out_fixtures.sort_by(|a, b| a.round.cmp(&b.round).then(a.home.cmp(&b.home)));
    report.fixtures_read = out_fixtures.len();

    let (current_round, completed_rounds) = round_context(array(bootstrap, "events"), now);

    (
        SeasonData {
            players,
            clubs,
            fixtures: out_fixtures,
            current_round,
            completed_rounds,
        },
        report,
    )
}

fn normalize_clubs(rows: &[Value], league_mean: f64, report: &mut IngestReport) -> Vec<Club> {
    let mut clubs = Vec::new();
    let mut raw = Vec::new();
    for row in rows {
        let Some(id) = id_field(row, CLUB_ID) else {
            report.push_note("[WARN] Skipped club row without id");
            continue;
        };
        let name = str_field(row, CLUB_NAME)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Club {id}"));
        let short_name = str_field(row, CLUB_SHORT)
            .map(str::to_string)
            .unwrap_or_default();
        raw.push(RawClubStrength {
            attack: mean_present(&[num_field(row, ATTACK_HOME), num_field(row, ATTACK_AWAY)])
                .or_else(|| num_field(row, ATTACK_RATING)),
            defence: mean_present(&[num_field(row, DEFENCE_HOME), num_field(row, DEFENCE_AWAY)])
                .or_else(|| num_field(row, DEFENCE_RATING)),
            overall: num_field(row, OVERALL),
        });
        clubs.push(Club {
            id,
            name,
            short_name,
            strength: ClubStrength::neutral(league_mean),
        });
    }
    for (club, strength) in clubs.iter_mut().zip(derive_strengths(&raw, league_mean)) {
        club.strength = strength;
    }
    report.clubs_read = clubs.len();
    clubs
}

/// Attack and defence ratings rescaled so each has `league_mean` as its
/// average across clubs. Missing values fall back to the overall strength
/// field, then to the league mean.
pub fn derive_strengths(raw: &[RawClubStrength], league_mean: f64) -> Vec<ClubStrength> {
    let attack_mean = mean_present(&raw.iter().map(|r| r.attack).collect::<Vec<_>>());
    let defence_mean = mean_present(&raw.iter().map(|r| r.defence).collect::<Vec<_>>());
    let overall_mean = mean_present(&raw.iter().map(|r| r.overall).collect::<Vec<_>>());

    let scale = |v: Option<f64>, mean: Option<f64>| -> Option<f64> {
        let (v, mean) = (v?, mean?);
        (mean > 0.0).then(|| v / mean * league_mean)
    };

    raw.iter()
        .map(|r| {
            let fallback = scale(r.overall, overall_mean).unwrap_or(league_mean);
            ClubStrength {
                attack: scale(r.attack, attack_mean).unwrap_or(fallback),
                defence: scale(r.defence, defence_mean).unwrap_or(fallback),
            }
        })
        .collect()
}

/// Re-centres an already-derived rating table on `league_mean`.
pub fn rescale_strengths(clubs: &mut [Club], league_mean: f64) {
    let raw: Vec<RawClubStrength> = clubs
        .iter()
        .map(|c| RawClubStrength {
            attack: Some(c.strength.attack),
            defence: Some(c.strength.defence),
            overall: None,
        })
        .collect();
    for (club, s) in clubs.iter_mut().zip(derive_strengths(&raw, league_mean)) {
        club.strength = s;
    }
}

fn normalize_player(row: &Value, clubs: &HashMap<u32, String>) -> std::result::Result<Player, String> {
    let id = id_field(row, PLAYER_ID).ok_or_else(|| "missing id".to_string())?;
    let position = field(row, PLAYER_POSITION)
        .and_then(|v| match v {
            Value::Number(n) => n.as_u64().and_then(Position::from_code),
            Value::String(s) => Position::from_label(s)
                .or_else(|| s.trim().parse::<u64>().ok().and_then(Position::from_code)),
            _ => None,
        })
        .ok_or_else(|| format!("player {id} has no known position code"))?;
    let club_id = id_field(row, PLAYER_CLUB).ok_or_else(|| format!("player {id} has no club"))?;
    let club = clubs
        .get(&club_id)
        .cloned()
        .ok_or_else(|| format!("player {id} references unknown club {club_id}"))?;
    let price = num_field(row, PRICE_MINOR)
        .map(|minor| minor / 10.0)
        .or_else(|| num_field(row, PRICE_MAJOR))
        .filter(|p| p.is_finite() && *p >= 0.0)
        .ok_or_else(|| format!("player {id} has no price"))?;

    let first = str_field(row, FIRST_NAME).unwrap_or_default();
    let second = str_field(row, SECOND_NAME).unwrap_or_default();
    let full_name = format!("{first} {second}").trim().to_string();
    let name = str_field(row, PLAYER_NAME)
        .map(str::to_string)
        .or_else(|| (!full_name.is_empty()).then(|| full_name.clone()))
        .unwrap_or_else(|| format!("Player {id}"));

    Ok(Player {
        id,
        full_name: if full_name.is_empty() { name.clone() } else { full_name },
        name,
        club_id,
        club,
        position,
        price,
        chance_of_playing: num_field(row, CHANCE),
        minutes: non_negative(num_field(row, MINUTES)),
        // Attacking rates are filled by enrichment; absent source means 0.0.
        xg_per90: 0.0,
        xa_per90: 0.0,
        form: non_negative(num_field(row, FORM)),
        selected_by_percent: non_negative(num_field(row, SELECTED)),
    })
}

fn normalize_fixture(row: &Value, clubs: &HashMap<u32, String>) -> Option<Fixture> {
    let round = id_field(row, FIX_ROUND)?;
    let home = id_field(row, FIX_HOME)?;
    let away = id_field(row, FIX_AWAY)?;
    if !clubs.contains_key(&home) || !clubs.contains_key(&away) {
        return None;
    }
    Some(Fixture {
        round,
        home,
        away,
        home_difficulty: difficulty(num_field(row, FIX_HOME_DIFF)),
        away_difficulty: difficulty(num_field(row, FIX_AWAY_DIFF)),
        finished: row.get("finished").and_then(Value::as_bool).unwrap_or(false),
    })
}

/// Returns `(current_round, completed_rounds)`. The current round is the one
/// flagged current (unless already finished), else the one flagged next, else
/// the first with a future deadline, else 1.
pub fn round_context(events: &[Value], now: DateTime<Utc>) -> (u32, u32) {
    let flag = |e: &Value, key: &str| e.get(key).and_then(Value::as_bool).unwrap_or(false);
    let completed = events.iter().filter(|e| flag(e, "finished")).count() as u32;

    let current = events
        .iter()
        .find(|e| flag(e, "is_current") && !flag(e, "finished"))
        .or_else(|| events.iter().find(|e| flag(e, "is_next")))
        .or_else(|| events.iter().find(|e| flag(e, "is_current")))
        .and_then(|e| id_field(e, &["id"]));
    if let Some(round) = current {
        return (round, completed);
    }

    let by_deadline = events
        .iter()
        .filter_map(|e| {
            let id = id_field(e, &["id"])?;
            let deadline = e.get("deadline_time").and_then(Value::as_str)?;
            let deadline = DateTime::parse_from_rfc3339(deadline).ok()?;
            (deadline.with_timezone(&Utc) > now).then_some(id)
        })
        .min();
    (by_deadline.unwrap_or(1), completed)
}

fn array<'a>(v: &'a Value, key: &str) -> &'a [Value] {
    v.get(key)
        .and_then(Value::as_array)
        .map(|a| a.as_slice())
        .unwrap_or(&[])
}

fn field<'a>(row: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|k| row.get(*k))
        .find(|v| !v.is_null())
}

pub(crate) fn num_field(row: &Value, aliases: &[&str]) -> Option<f64> {
    aliases.iter().find_map(|k| row.get(*k).and_then(number))
}

pub(crate) fn str_field<'a>(row: &'a Value, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|k| row.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

pub(crate) fn id_field(row: &Value, aliases: &[&str]) -> Option<u32> {
    aliases.iter().find_map(|k| row.get(*k).and_then(id_value))
}

pub(crate) fn id_value(v: &Value) -> Option<u32> {
    let v = number(v)?;
    (v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64).then_some(v as u32)
}

/// Numbers arrive either as JSON numbers or as strings like "5.2" or "12.3%".
pub(crate) fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim().trim_end_matches('%').replace(',', "");
            if s.is_empty() || s == "-" {
                return None;
            }
            s.parse::<f64>().ok().filter(|x| x.is_finite())
        }
        _ => None,
    }
}

fn non_negative(v: Option<f64>) -> f64 {
    v.filter(|x| x.is_finite()).unwrap_or(0.0).max(0.0)
}

fn difficulty(v: Option<f64>) -> u8 {
    v.map(|d| d.round().clamp(1.0, 5.0) as u8)
        .unwrap_or(DEFAULT_DIFFICULTY)
}

fn mean_present(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}
