use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{Club, ClubStrength, Fixture, PerPosition, Player, Position, SeasonData};
use crate::normalize::rescale_strengths;

/// Shape of a generated league. Same spec and seed, same league.
#[derive(Debug, Clone)]
pub struct LeagueSpec {
    pub clubs: u32,
    pub per_club: PerPosition<usize>,
    pub rounds: u32,
    /// First round still to be played; earlier rounds are marked finished.
    pub start_round: u32,
    /// Round in which the first two fixtures are dropped.
    pub blank_round: Option<u32>,
    /// Round that also hosts the first fixture of the following round.
    pub double_round: Option<u32>,
    pub seed: u64,
}

impl Default for LeagueSpec {
    fn default() -> Self {
        Self {
            clubs: 20,
            per_club: PerPosition::new(3, 8, 8, 5),
            rounds: 10,
            start_round: 1,
            blank_round: None,
            double_round: None,
            seed: 7,
        }
    }
}

struct PositionProfile {
    price_lo: f64,
    price_hi: f64,
    xg_max: f64,
    xa_max: f64,
}

fn profile(pos: Position) -> PositionProfile {
    match pos {
        Position::Goalkeeper => PositionProfile {
            price_lo: 4.0,
            price_hi: 5.5,
            xg_max: 0.0,
            xa_max: 0.02,
        },
        Position::Defender => PositionProfile {
            price_lo: 4.0,
            price_hi: 7.0,
            xg_max: 0.12,
            xa_max: 0.2,
        },
        Position::Midfielder => PositionProfile {
            price_lo: 4.5,
            price_hi: 12.5,
            xg_max: 0.55,
            xa_max: 0.4,
        },
        Position::Forward => PositionProfile {
            price_lo: 4.5,
            price_hi: 13.0,
            xg_max: 0.75,
            xa_max: 0.25,
        },
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub fn synthetic_league(spec: &LeagueSpec) -> SeasonData {
    let mut rng = StdRng::seed_from_u64(spec.seed);

    let mut clubs: Vec<Club> = (1..=spec.clubs)
        .map(|id| Club {
            id,
            name: format!("Club {id:02}"),
            short_name: format!("C{id:02}"),
            strength: ClubStrength {
                attack: rng.gen_range(2.0..4.0),
                defence: rng.gen_range(2.0..4.0),
            },
        })
        .collect();
    rescale_strengths(&mut clubs, 3.0);

    let fixtures = schedule(spec, &clubs);
    let completed_rounds = spec.start_round.saturating_sub(1);

    let mut players = Vec::new();
    let mut next_id = 1;
    for club in &clubs {
        for pos in Position::ALL {
            let prof = profile(pos);
            for n in 0..spec.per_club.get(pos) {
                let quality: f64 = rng.gen_range(0.0..1.0);
                let attack = club.strength.attack / 3.0;
                let chance_of_playing = if rng.gen_bool(0.1) {
                    Some([0.0, 25.0, 50.0, 75.0][rng.gen_range(0..4)])
                } else {
                    None
                };
                players.push(Player {
                    id: next_id,
                    name: format!("{} {} {}", club.short_name, pos.label(), n + 1),
                    full_name: format!("{} {} Player {}", club.name, pos.label(), n + 1),
                    club_id: club.id,
                    club: club.name.clone(),
                    position: pos,
                    price: round1(prof.price_lo + quality * (prof.price_hi - prof.price_lo)),
                    chance_of_playing,
                    minutes: round1(completed_rounds as f64 * 90.0 * rng.gen_range(0.2..1.0)),
                    xg_per90: quality * prof.xg_max * attack,
                    xa_per90: quality * prof.xa_max * attack,
                    form: round1(rng.gen_range(0.0..10.0)),
                    selected_by_percent: round1(quality * rng.gen_range(5.0..55.0)),
                });
                next_id += 1;
            }
        }
    }

    SeasonData {
        players,
        clubs,
        fixtures,
        current_round: spec.start_round.max(1),
        completed_rounds,
    }
}

/// Circle-method round robin over `spec.rounds` rounds. Difficulty for each
/// side comes from the opponent's overall strength.
fn schedule(spec: &LeagueSpec, clubs: &[Club]) -> Vec<Fixture> {
    let mut ids: Vec<Option<u32>> = clubs.iter().map(|c| Some(c.id)).collect();
    if ids.len() % 2 == 1 {
        ids.push(None);
    }
    let n = ids.len();
    if n < 2 {
        return Vec::new();
    }

    let overall = |id: u32| {
        clubs
            .iter()
            .find(|c| c.id == id)
            .map(|c| (c.strength.attack + c.strength.defence) / 2.0)
            .unwrap_or(3.0)
    };
    // 2.0 overall maps to difficulty 1, 4.0 to 5.
    let difficulty = |opponent: u32| (1.0 + (overall(opponent) - 2.0) * 2.0).round().clamp(1.0, 5.0) as u8;

    let mut per_round: Vec<Vec<(u32, u32)>> = Vec::with_capacity(spec.rounds as usize);
    let mut ring = ids;
    for r in 0..spec.rounds {
        let mut pairs = Vec::with_capacity(n / 2);
        for i in 0..n / 2 {
            if let (Some(a), Some(b)) = (ring[i], ring[n - 1 - i]) {
                let (home, away) = if (r as usize + i) % 2 == 0 { (a, b) } else { (b, a) };
                pairs.push((home, away));
            }
        }
        per_round.push(pairs);
        // Keep the first entry fixed and rotate the rest.
        ring[1..].rotate_right(1);
    }

    let mut fixtures = Vec::new();
    for (idx, pairs) in per_round.iter().enumerate() {
        let round = idx as u32 + 1;
        let skip = if spec.blank_round == Some(round) { 2 } else { 0 };
        let mut round_pairs: Vec<(u32, u32)> = pairs.iter().skip(skip).copied().collect();
        if spec.double_round == Some(round)
            && let Some(extra) = per_round.get(idx + 1).and_then(|next| next.first())
        {
            round_pairs.push(*extra);
        }
        for (home, away) in round_pairs {
            fixtures.push(Fixture {
                round,
                home,
                away,
                home_difficulty: difficulty(away),
                away_difficulty: difficulty(home),
                finished: round < spec.start_round,
            });
        }
    }
    fixtures
}
