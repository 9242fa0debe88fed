use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "GK")]
    Goalkeeper,
    #[serde(rename = "DEF")]
    Defender,
    #[serde(rename = "MID")]
    Midfielder,
    #[serde(rename = "FWD")]
    Forward,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    /// Numeric `element_type` code used by the public fantasy API.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(Position::Goalkeeper),
            2 => Some(Position::Defender),
            3 => Some(Position::Midfielder),
            4 => Some(Position::Forward),
            _ => None,
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        let s = raw.trim().to_ascii_uppercase();
        match s.as_str() {
            "GK" | "GKP" | "GOALKEEPER" => Some(Position::Goalkeeper),
            "DEF" | "DEFENDER" => Some(Position::Defender),
            "MID" | "MIDFIELDER" => Some(Position::Midfielder),
            "FWD" | "FW" | "FORWARD" => Some(Position::Forward),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One value per position. Used for quotas and position-dependent scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerPosition<T> {
    pub gk: T,
    pub def: T,
    pub mid: T,
    pub fwd: T,
}

impl<T: Copy> PerPosition<T> {
    pub const fn new(gk: T, def: T, mid: T, fwd: T) -> Self {
        Self { gk, def, mid, fwd }
    }

    pub const fn splat(v: T) -> Self {
        Self {
            gk: v,
            def: v,
            mid: v,
            fwd: v,
        }
    }

    pub fn get(&self, pos: Position) -> T {
        match pos {
            Position::Goalkeeper => self.gk,
            Position::Defender => self.def,
            Position::Midfielder => self.mid,
            Position::Forward => self.fwd,
        }
    }
}

impl<T> PerPosition<T> {
    pub fn at(&self, pos: Position) -> &T {
        match pos {
            Position::Goalkeeper => &self.gk,
            Position::Defender => &self.def,
            Position::Midfielder => &self.mid,
            Position::Forward => &self.fwd,
        }
    }

    pub fn get_mut(&mut self, pos: Position) -> &mut T {
        match pos {
            Position::Goalkeeper => &mut self.gk,
            Position::Defender => &mut self.def,
            Position::Midfielder => &mut self.mid,
            Position::Forward => &mut self.fwd,
        }
    }
}

impl PerPosition<usize> {
    pub fn total(&self) -> usize {
        self.gk + self.def + self.mid + self.fwd
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    pub club_id: u32,
    pub club: String,
    pub position: Position,
    pub price: f64,
    // 0..100, `None` means no flag was published (fully available).
    #[serde(default)]
    pub chance_of_playing: Option<f64>,
    #[serde(default)]
    pub minutes: f64,
    #[serde(default)]
    pub xg_per90: f64,
    #[serde(default)]
    pub xa_per90: f64,
    #[serde(default)]
    pub form: f64,
    #[serde(default)]
    pub selected_by_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClubStrength {
    pub attack: f64,
    pub defence: f64,
}

impl ClubStrength {
    pub fn neutral(league_mean: f64) -> Self {
        Self {
            attack: league_mean,
            defence: league_mean,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Club {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    pub strength: ClubStrength,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub round: u32,
    pub home: u32,
    pub away: u32,
    // 1 = easiest, 5 = hardest, from the perspective of each side.
    pub home_difficulty: u8,
    pub away_difficulty: u8,
    #[serde(default)]
    pub finished: bool,
}

/// Canonical tables produced by ingestion and consumed by every later stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonData {
    pub players: Vec<Player>,
    pub clubs: Vec<Club>,
    pub fixtures: Vec<Fixture>,
    pub current_round: u32,
    pub completed_rounds: u32,
}

impl SeasonData {
    pub fn player_index(&self) -> HashMap<u32, &Player> {
        self.players.iter().map(|p| (p.id, p)).collect()
    }

    pub fn club_strengths(&self) -> HashMap<u32, ClubStrength> {
        self.clubs.iter().map(|c| (c.id, c.strength)).collect()
    }
}
