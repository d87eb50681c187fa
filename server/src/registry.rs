//! Player registration and lifecycle for the arena server
//!
//! This module owns the server-side roster of registered players, including:
//! - Player creation at registration and removal at disconnect
//! - Per-player scoring state (score, click streak, cooldown deadline)
//! - The per-player set of active power-up effects and their expiries
//!
//! The registry is only ever touched from the game loop task, which processes
//! one inbound event to completion before the next. That serialization is
//! what makes creation and removal atomic with respect to the increment
//! processor and the power-up ledger.

use log::info;
use shared::PowerUpKind;
use std::collections::HashMap;

/// A registered participant and the scoring state the server tracks for them
///
/// Every mutation flows through the increment processor or the power-up
/// ledger for this player's id. The record dies with the connection; neither
/// score nor identity survives a disconnect.
#[derive(Debug, Clone)]
pub struct Player {
    /// Unique player identifier assigned by the gateway at connect time
    pub id: u32,
    /// Display name, set once at registration
    pub username: String,
    /// Accumulated score; only purchase deductions ever lower it
    pub score: u64,
    /// Consecutive increments spaced under the streak window
    pub streak: u32,
    /// Timestamp (ms) of the last accepted increment
    pub last_click_ms: u64,
    /// Increments before this timestamp (ms) are rate-limited
    pub cooldown_until_ms: u64,
    /// Active effects, keyed by kind, holding the expiry timestamp (ms)
    pub effects: HashMap<PowerUpKind, u64>,
}

impl Player {
    /// Creates a fresh player with a zero score and no effects or cooldown.
    pub fn new(id: u32, username: String) -> Self {
        Self {
            id,
            username,
            score: 0,
            streak: 0,
            last_click_ms: 0,
            cooldown_until_ms: 0,
            effects: HashMap::new(),
        }
    }

    /// Returns true iff an effect of `kind` exists and expires after `now_ms`.
    ///
    /// An effect whose expiry equals `now_ms` is already inactive; the sweep
    /// uses the same boundary so the two can never disagree.
    pub fn effect_active(&self, kind: PowerUpKind, now_ms: u64) -> bool {
        self.effects.get(&kind).is_some_and(|&expiry| expiry > now_ms)
    }
}

/// Roster of all registered players
///
/// Provides the create/get/remove/snapshot contract the rest of the server
/// builds on. Ids are allocated by the gateway, so the registry only checks
/// uniqueness rather than generating identifiers itself.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    /// Registered players indexed by their unique id
    players: HashMap<u32, Player>,
}

impl PlayerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
        }
    }

    /// Attempts to register a new player under the given id
    ///
    /// Returns false if the id is already registered, in which case nothing
    /// changes. Logs the registration for server monitoring.
    pub fn create(&mut self, id: u32, username: String) -> bool {
        if self.players.contains_key(&id) {
            return false;
        }

        info!("Player {} registered as {:?}", id, username);
        self.players.insert(id, Player::new(id, username));
        true
    }

    /// Looks up a player by id.
    pub fn get(&self, id: &u32) -> Option<&Player> {
        self.players.get(id)
    }

    /// Looks up a player by id for mutation.
    pub fn get_mut(&mut self, id: &u32) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    /// Removes a player from the roster
    ///
    /// Idempotent: returns true if the player was present, false if they were
    /// already gone. Removal drops the whole record, so no cooldown or effect
    /// state can outlive the player.
    pub fn remove(&mut self, id: &u32) -> bool {
        if let Some(player) = self.players.remove(id) {
            info!("Player {} ({:?}) removed", player.id, player.username);
            true
        } else {
            false
        }
    }

    /// Returns all players ordered by ascending id
    ///
    /// The fixed order gives the leaderboard a stable base sequence, so equal
    /// scores always tie-break the same way between broadcasts.
    pub fn snapshot(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by_key(|p| p.id);
        players
    }

    /// Iterates over all players for mutation, in arbitrary order.
    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    /// Returns the number of registered players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns true if no players are registered.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_creation() {
        let player = Player::new(1, "ada".to_string());

        assert_eq!(player.id, 1);
        assert_eq!(player.username, "ada");
        assert_eq!(player.score, 0);
        assert_eq!(player.streak, 0);
        assert_eq!(player.cooldown_until_ms, 0);
        assert!(player.effects.is_empty());
    }

    #[test]
    fn test_effect_active_boundary() {
        let mut player = Player::new(1, "ada".to_string());
        player.effects.insert(PowerUpKind::Shield, 5000);

        assert!(player.effect_active(PowerUpKind::Shield, 4999));
        assert!(!player.effect_active(PowerUpKind::Shield, 5000));
        assert!(!player.effect_active(PowerUpKind::Shield, 5001));
        assert!(!player.effect_active(PowerUpKind::RapidFire, 0));
    }

    #[test]
    fn test_create_player() {
        let mut registry = PlayerRegistry::new();

        assert!(registry.create(1, "ada".to_string()));
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
        assert_eq!(registry.get(&1).unwrap().username, "ada");
    }

    #[test]
    fn test_create_duplicate_id_fails() {
        let mut registry = PlayerRegistry::new();

        assert!(registry.create(1, "ada".to_string()));
        assert!(!registry.create(1, "impostor".to_string()));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&1).unwrap().username, "ada");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = PlayerRegistry::new();
        registry.create(1, "ada".to_string());

        assert!(registry.remove(&1));
        assert!(!registry.remove(&1));
        assert!(registry.is_empty());
        assert!(registry.get(&1).is_none());
    }

    #[test]
    fn test_snapshot_is_ordered_by_id() {
        let mut registry = PlayerRegistry::new();
        registry.create(3, "carol".to_string());
        registry.create(1, "ada".to_string());
        registry.create(2, "bob".to_string());

        let ids: Vec<u32> = registry.snapshot().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
