use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Club, Fixture};

/// One fixture seen from a single club's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClubFixture {
    pub round: u32,
    pub opponent: u32,
    pub home: bool,
    pub difficulty: u8,
}

/// Rounds `start ..= start + rounds - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureWindow {
    pub start_round: u32,
    pub rounds: u8,
}

impl FixtureWindow {
    pub fn new(start_round: u32, rounds: u8) -> Self {
        Self {
            start_round,
            rounds,
        }
    }

    pub fn contains(&self, round: u32) -> bool {
        round >= self.start_round && round < self.start_round + self.rounds as u32
    }
}

/// Every club's fixtures inside the window, in round order. Clubs with a
/// blank in every round of the window have no entry.
pub fn club_schedule(fixtures: &[Fixture], window: FixtureWindow) -> HashMap<u32, Vec<ClubFixture>> {
    let mut out: HashMap<u32, Vec<ClubFixture>> = HashMap::new();
    for f in fixtures.iter().filter(|f| window.contains(f.round)) {
        out.entry(f.home).or_default().push(ClubFixture {
            round: f.round,
            opponent: f.away,
            home: true,
            difficulty: f.home_difficulty,
        });
        out.entry(f.away).or_default().push(ClubFixture {
            round: f.round,
            opponent: f.home,
            home: false,
            difficulty: f.away_difficulty,
        });
    }
    for list in out.values_mut() {
        list.sort_by_key(|c| (c.round, c.opponent));
    }
    out
}

/// Rounds in which a club plays twice (doubles) or not at all (blanks).
pub fn irregular_rounds(fixtures: &[Fixture], club_id: u32, window: FixtureWindow) -> (Vec<u32>, Vec<u32>) {
    let mut per_round: HashMap<u32, usize> = HashMap::new();
    for f in fixtures.iter().filter(|f| window.contains(f.round)) {
        if f.home == club_id || f.away == club_id {
            *per_round.entry(f.round).or_default() += 1;
        }
    }
    let mut doubles = Vec::new();
    let mut blanks = Vec::new();
    for round in window.start_round..window.start_round + window.rounds as u32 {
        match per_round.get(&round).copied().unwrap_or(0) {
            0 => blanks.push(round),
            1 => {}
            _ => doubles.push(round),
        }
    }
    (doubles, blanks)
}

#[derive(Debug, Clone, Serialize)]
pub struct TickerRow {
    pub club_id: u32,
    pub club: String,
    pub fixtures: usize,
    pub easy: usize,
    pub hard: usize,
}

/// Easy (difficulty 1-2) and hard (4-5) fixture counts per club over
/// `from_round ..= to_round`, easiest runs first.
pub fn fixture_ticker(fixtures: &[Fixture], clubs: &[Club], from_round: u32, to_round: u32) -> Vec<TickerRow> {
    let mut rows: HashMap<u32, TickerRow> = clubs
        .iter()
        .map(|c| {
            (
                c.id,
                TickerRow {
                    club_id: c.id,
                    club: c.name.clone(),
                    fixtures: 0,
                    easy: 0,
                    hard: 0,
                },
            )
        })
        .collect();

    for f in fixtures
        .iter()
        .filter(|f| f.round >= from_round && f.round <= to_round)
    {
        for (club_id, difficulty) in [(f.home, f.home_difficulty), (f.away, f.away_difficulty)] {
            let row = rows.entry(club_id).or_insert_with(|| TickerRow {
                club_id,
                club: format!("Club {club_id}"),
                fixtures: 0,
                easy: 0,
                hard: 0,
            });
            row.fixtures += 1;
            match difficulty {
                1 | 2 => row.easy += 1,
                4 | 5 => row.hard += 1,
                _ => {}
            }
        }
    }

    let mut out: Vec<TickerRow> = rows.into_values().collect();
    out.sort_by(|a, b| {
        b.easy
            .cmp(&a.easy)
            .then(a.hard.cmp(&b.hard))
            .then(a.club_id.cmp(&b.club_id))
    });
    out
}
