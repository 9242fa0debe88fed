use std::collections::HashMap;

use serde::Serialize;

use crate::config::SquadRules;
use crate::error::SquadError;
use crate::model::{PerPosition, Player, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SquadStatus {
    Empty,
    Building,
    Legal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SquadSlot {
    pub player_id: u32,
    pub position: Position,
    pub club_id: u32,
    pub price: f64,
}

impl SquadSlot {
    pub fn of(player: &Player) -> Self {
        Self {
            player_id: player.id,
            position: player.position,
            club_id: player.club_id,
            price: player.price,
        }
    }
}

/// A squad under construction or edit. Every mutation is checked against
/// size, position quotas and the club cap; a rejected edit leaves the squad
/// untouched.
#[derive(Debug, Clone)]
pub struct Squad {
    slots: Vec<SquadSlot>,
    quotas: PerPosition<usize>,
    max_per_club: usize,
}

impl Squad {
    pub fn new(rules: &SquadRules) -> Self {
        Self::with_limits(rules.quotas, rules.max_per_club)
    }

    pub fn with_limits(quotas: PerPosition<usize>, max_per_club: usize) -> Self {
        Self {
            slots: Vec::with_capacity(quotas.total()),
            quotas,
            max_per_club,
        }
    }

    /// Builds a squad from ids, applying the same checks as `add` in order.
    pub fn from_ids(
        ids: &[u32],
        players: &HashMap<u32, &Player>,
        quotas: PerPosition<usize>,
        max_per_club: usize,
    ) -> Result<Self, SquadError> {
        let mut squad = Self::with_limits(quotas, max_per_club);
        for id in ids {
            let player = players.get(id).ok_or(SquadError::UnknownPlayer(*id))?;
            squad.add(player)?;
        }
        Ok(squad)
    }

    pub fn capacity(&self) -> usize {
        self.quotas.total()
    }

    pub fn max_per_club(&self) -> usize {
        self.max_per_club
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[SquadSlot] {
        &self.slots
    }

    pub fn ids(&self) -> Vec<u32> {
        self.slots.iter().map(|s| s.player_id).collect()
    }

    pub fn contains(&self, player_id: u32) -> bool {
        self.slots.iter().any(|s| s.player_id == player_id)
    }

    pub fn get(&self, player_id: u32) -> Option<&SquadSlot> {
        self.slots.iter().find(|s| s.player_id == player_id)
    }

    pub fn count(&self, position: Position) -> usize {
        self.slots.iter().filter(|s| s.position == position).count()
    }

    pub fn club_count(&self, club_id: u32) -> usize {
        self.slots.iter().filter(|s| s.club_id == club_id).count()
    }

    pub fn total_cost(&self) -> f64 {
        self.slots.iter().map(|s| s.price).sum()
    }

    pub fn status(&self) -> SquadStatus {
        if self.slots.is_empty() {
            SquadStatus::Empty
        } else if self.validate().is_ok() {
            SquadStatus::Legal
        } else {
            SquadStatus::Building
        }
    }

    /// First violated rule, if any. A legal squad is full with every quota
    /// met exactly and no club above the cap.
    pub fn validate(&self) -> Result<(), SquadError> {
        if self.slots.len() != self.capacity() {
            return Err(SquadError::NotLegal {
                reason: format!("{} of {} players", self.slots.len(), self.capacity()),
            });
        }
        for pos in Position::ALL {
            let have = self.count(pos);
            let want = self.quotas.get(pos);
            if have != want {
                return Err(SquadError::NotLegal {
                    reason: format!("{have} {pos} where {want} are required"),
                });
            }
        }
        let mut clubs: HashMap<u32, usize> = HashMap::new();
        for s in &self.slots {
            *clubs.entry(s.club_id).or_default() += 1;
        }
        if let Some((club, n)) = clubs.iter().find(|(_, n)| **n > self.max_per_club) {
            return Err(SquadError::NotLegal {
                reason: format!("club {club} has {n} players"),
            });
        }
        Ok(())
    }

    pub fn require_legal(&self) -> Result<(), SquadError> {
        self.validate()
    }

    fn check_add(&self, slot: &SquadSlot, vacated: Option<&SquadSlot>) -> Result<(), SquadError> {
        if self.contains(slot.player_id) {
            return Err(SquadError::Duplicate(slot.player_id));
        }
        let size = self.slots.len() - usize::from(vacated.is_some());
        if size >= self.capacity() {
            return Err(SquadError::Full(self.capacity()));
        }
        let limit = self.quotas.get(slot.position);
        let in_position = self.count(slot.position)
            - usize::from(vacated.is_some_and(|v| v.position == slot.position));
        if in_position >= limit {
            return Err(SquadError::QuotaExceeded {
                position: slot.position,
                limit,
            });
        }
        let in_club = self.club_count(slot.club_id)
            - usize::from(vacated.is_some_and(|v| v.club_id == slot.club_id));
        if in_club >= self.max_per_club {
            return Err(SquadError::ClubLimit {
                club_id: slot.club_id,
                limit: self.max_per_club,
            });
        }
        Ok(())
    }

    pub fn add(&mut self, player: &Player) -> Result<(), SquadError> {
        let slot = SquadSlot::of(player);
        self.check_add(&slot, None)?;
        self.slots.push(slot);
        Ok(())
    }

    pub fn remove(&mut self, player_id: u32) -> Result<SquadSlot, SquadError> {
        let idx = self
            .slots
            .iter()
            .position(|s| s.player_id == player_id)
            .ok_or(SquadError::NotInSquad(player_id))?;
        Ok(self.slots.remove(idx))
    }

    /// Swaps `out_id` for `incoming` as one edit: either both happen or neither.
    /// The incoming slot takes the outgoing slot's place in the order.
    pub fn replace(&mut self, out_id: u32, incoming: &Player) -> Result<SquadSlot, SquadError> {
        let idx = self
            .slots
            .iter()
            .position(|s| s.player_id == out_id)
            .ok_or(SquadError::NotInSquad(out_id))?;
        let slot = SquadSlot::of(incoming);
        let vacated = self.slots[idx];
        self.check_add(&slot, Some(&vacated))?;
        self.slots[idx] = slot;
        Ok(vacated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: u32, club_id: u32, position: Position, price: f64) -> Player {
        Player {
            id,
            name: format!("P{id}"),
            full_name: format!("P{id}"),
            club_id,
            club: format!("C{club_id}"),
            position,
            price,
            chance_of_playing: None,
            minutes: 0.0,
            xg_per90: 0.0,
            xa_per90: 0.0,
            form: 0.0,
            selected_by_percent: 0.0,
        }
    }

    fn legal_pool() -> Vec<Player> {
        use Position::*;
        let layout = [
            (Goalkeeper, 2),
            (Defender, 5),
            (Midfielder, 5),
            (Forward, 3),
        ];
        let mut out = Vec::new();
        let mut id = 1;
        for (pos, n) in layout {
            for _ in 0..n {
                // Five clubs, three players each.
                out.push(p(id, (id - 1) % 5 + 1, pos, 5.0));
                id += 1;
            }
        }
        out
    }

    #[test]
    fn lifecycle_moves_through_states() {
        let rules = SquadRules::default();
        let pool = legal_pool();
        let mut squad = Squad::new(&rules);
        assert_eq!(squad.status(), SquadStatus::Empty);
        squad.add(&pool[0]).unwrap();
        assert_eq!(squad.status(), SquadStatus::Building);
        for pl in &pool[1..] {
            squad.add(pl).unwrap();
        }
        assert_eq!(squad.status(), SquadStatus::Legal);
        assert!((squad.total_cost() - 75.0).abs() < 1e-9);
        squad.remove(3).unwrap();
        assert_eq!(squad.status(), SquadStatus::Building);
        assert!(matches!(squad.require_legal(), Err(SquadError::NotLegal { .. })));
    }

    #[test]
    fn rejects_quota_club_and_duplicates() {
        let rules = SquadRules::default();
        let mut squad = Squad::new(&rules);
        squad.add(&p(1, 1, Position::Goalkeeper, 4.0)).unwrap();
        squad.add(&p(2, 2, Position::Goalkeeper, 4.0)).unwrap();
        assert_eq!(
            squad.add(&p(3, 3, Position::Goalkeeper, 4.0)),
            Err(SquadError::QuotaExceeded {
                position: Position::Goalkeeper,
                limit: 2
            })
        );
        assert_eq!(squad.add(&p(1, 1, Position::Goalkeeper, 4.0)), Err(SquadError::Duplicate(1)));
        squad.add(&p(4, 1, Position::Defender, 4.0)).unwrap();
        squad.add(&p(5, 1, Position::Defender, 4.0)).unwrap();
        assert_eq!(
            squad.add(&p(6, 1, Position::Forward, 4.0)),
            Err(SquadError::ClubLimit {
                club_id: 1,
                limit: 3
            })
        );
        assert_eq!(squad.len(), 4);
        assert_eq!(squad.remove(99), Err(SquadError::NotInSquad(99)));
    }

    #[test]
    fn replace_counts_the_vacated_slot() {
        let rules = SquadRules::default();
        let pool = legal_pool();
        let mut squad = Squad::new(&rules);
        for pl in &pool {
            squad.add(pl).unwrap();
        }
        // Player 3 is a defender at club 3; a club-3 defender may replace them.
        let same_club = p(100, 3, Position::Defender, 5.0);
        squad.replace(3, &same_club).unwrap();
        assert!(squad.contains(100));
        assert_eq!(squad.status(), SquadStatus::Legal);

        // Club 1 is full and player 100 is not from club 1.
        let club_one = p(101, 1, Position::Defender, 5.0);
        assert!(matches!(
            squad.replace(100, &club_one),
            Err(SquadError::ClubLimit { club_id: 1, .. })
        ));
        // Wrong position for the vacated slot.
        let mid = p(102, 3, Position::Midfielder, 5.0);
        assert!(matches!(squad.replace(100, &mid), Err(SquadError::QuotaExceeded { .. })));
        assert!(squad.contains(100));
        assert_eq!(squad.len(), 15);
    }

    #[test]
    fn from_ids_reports_unknown_player() {
        let pool = legal_pool();
        let index: HashMap<u32, &Player> = pool.iter().map(|p| (p.id, p)).collect();
        let rules = SquadRules::default();
        let err = Squad::from_ids(&[1, 2, 77], &index, rules.quotas, rules.max_per_club).unwrap_err();
        assert_eq!(err, SquadError::UnknownPlayer(77));
        let ids: Vec<u32> = pool.iter().map(|p| p.id).collect();
        let squad = Squad::from_ids(&ids, &index, rules.quotas, rules.max_per_club).unwrap();
        assert_eq!(squad.status(), SquadStatus::Legal);
    }
}
