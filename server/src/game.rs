//! Authoritative game state: the increment processor and power-up ledger
//!
//! All mutations of the shared counter and the player roster happen through
//! the methods on [`GameState`]. Each method is a complete state transition:
//! it validates the request, applies the mutation, and returns the outbound
//! traffic it produced as [`Outbound`] dispatches. The network layer fans
//! those out; nothing in here ever touches a socket, which is what keeps the
//! core deterministic and testable with an injected clock and RNG.

use log::{debug, warn};
use rand::Rng;

use crate::leaderboard;
use crate::registry::PlayerRegistry;
use shared::{
    PowerUpKind, ServerMessage, COOLDOWN_BASE_MS, COOLDOWN_BOOSTED_MS, DEMO_DOUBLE_CHANCE,
    DEMO_STREAK_BONUS, DOUBLE_CHANCE, STREAK_BONUS, STREAK_MILESTONE, STREAK_WINDOW_MS,
    TAUNT_CHANCE,
};

/// A send produced by a state transition, routed by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Deliver to a single player's connection.
    ToPlayer(u32, ServerMessage),
    /// Deliver to every open connection.
    ToAll(ServerMessage),
}

/// The single shared mutable state of the server
///
/// Owned exclusively by the game loop task; see the concurrency notes in the
/// crate documentation.
#[derive(Debug, Default)]
pub struct GameState {
    pub registry: PlayerRegistry,
    /// Sum of every accepted increment across all players. Purchases move
    /// score from "held" to "spent" and never touch this.
    pub total_counter: u64,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            registry: PlayerRegistry::new(),
            total_counter: 0,
        }
    }

    /// Registers a connected player under the gateway-assigned id
    ///
    /// The new player is sent the current counter so a joining client renders
    /// live state immediately, and everyone gets a fresh leaderboard. A
    /// duplicate registration for an id is dropped.
    pub fn register_player(
        &mut self,
        id: u32,
        username: String,
        now_ms: u64,
        rng: &mut impl Rng,
    ) -> Vec<Outbound> {
        if !self.registry.create(id, username) {
            warn!("Ignoring duplicate registration for player {}", id);
            return Vec::new();
        }

        let mut out = vec![Outbound::ToPlayer(
            id,
            ServerMessage::TotalCounter {
                total: self.total_counter,
            },
        )];
        out.extend(leaderboard::rebroadcast(&self.registry, false, now_ms, rng));
        out
    }

    /// Processes one increment request from `id`
    ///
    /// Implements the full admission pipeline: registration check, cooldown
    /// gate, multiplier draw, streak accounting, score/counter update,
    /// cooldown arming, and the resulting broadcasts. An unregistered id is a
    /// stale request and produces nothing.
    pub fn handle_increment(
        &mut self,
        id: u32,
        demo_mode: bool,
        now_ms: u64,
        rng: &mut impl Rng,
    ) -> Vec<Outbound> {
        let player = match self.registry.get_mut(&id) {
            Some(player) => player,
            None => return Vec::new(),
        };

        let rapid_fire = player.effect_active(PowerUpKind::RapidFire, now_ms);
        if !demo_mode && !rapid_fire && now_ms < player.cooldown_until_ms {
            debug!("Player {} rate limited", id);
            return vec![Outbound::ToPlayer(id, ServerMessage::RateLimited)];
        }

        let mut multiplier: f64 = 1.0;
        let double_chance = if demo_mode {
            DEMO_DOUBLE_CHANCE
        } else {
            DOUBLE_CHANCE
        };
        if rng.gen_bool(double_chance) {
            multiplier = 2.0;
        }
        if demo_mode {
            multiplier *= rng.gen_range(1.0..2.0);
        }
        if player.effect_active(PowerUpKind::DoubleClick, now_ms) {
            multiplier *= 2.0;
        }

        // Streak accounting happens after the draw so the milestone bonus is
        // additive on top of whatever the draw produced.
        if now_ms.saturating_sub(player.last_click_ms) < STREAK_WINDOW_MS {
            player.streak += 1;
        } else {
            player.streak = 1;
        }
        if player.streak % STREAK_MILESTONE == 0 {
            multiplier += if demo_mode {
                DEMO_STREAK_BONUS
            } else {
                STREAK_BONUS
            };
        }
        player.last_click_ms = now_ms;

        let delta = multiplier.floor() as u64;
        player.score += delta;
        self.total_counter += delta;

        if !rapid_fire && !demo_mode {
            player.cooldown_until_ms = now_ms
                + if multiplier > 1.0 {
                    COOLDOWN_BOOSTED_MS
                } else {
                    COOLDOWN_BASE_MS
                };
        }

        let mut out = vec![Outbound::ToAll(ServerMessage::TotalCounter {
            total: self.total_counter,
        })];
        let with_taunt = rng.gen_bool(TAUNT_CHANCE);
        out.extend(leaderboard::rebroadcast(
            &self.registry,
            with_taunt,
            now_ms,
            rng,
        ));
        if delta > 1 {
            out.push(Outbound::ToPlayer(
                id,
                ServerMessage::MultiplierGained { multiplier },
            ));
        }
        out
    }

    /// Attempts to buy `kind` for `id`
    ///
    /// Validation order: the player must exist (a missing id is a stale
    /// request and stays silent), afford the cost, and not already hold an
    /// active effect of that kind. A successful purchase deducts the cost,
    /// installs the expiry, notifies the buyer, and rebroadcasts the
    /// leaderboard since the visible score changed.
    pub fn purchase_power_up(
        &mut self,
        id: u32,
        kind: PowerUpKind,
        now_ms: u64,
        rng: &mut impl Rng,
    ) -> Vec<Outbound> {
        let player = match self.registry.get_mut(&id) {
            Some(player) => player,
            None => return Vec::new(),
        };

        if player.score < kind.cost() {
            return vec![Outbound::ToPlayer(
                id,
                ServerMessage::PowerUpError {
                    message: "Not enough points".to_string(),
                },
            )];
        }
        if player.effect_active(kind, now_ms) {
            return vec![Outbound::ToPlayer(
                id,
                ServerMessage::PowerUpError {
                    message: "Power-up already active".to_string(),
                },
            )];
        }

        player.score -= kind.cost();
        player.effects.insert(kind, now_ms + kind.duration_ms());
        debug!("Player {} activated {:?}", id, kind);

        let mut out = vec![Outbound::ToPlayer(
            id,
            ServerMessage::PowerUpActivated {
                power_up: kind,
                duration: kind.duration_ms(),
            },
        )];
        out.extend(leaderboard::rebroadcast(&self.registry, false, now_ms, rng));
        out
    }

    /// Removes a player after their connection closed
    ///
    /// Idempotent; a double removal produces no traffic. The surviving
    /// players get a leaderboard without the departed entry.
    pub fn remove_player(&mut self, id: u32, now_ms: u64, rng: &mut impl Rng) -> Vec<Outbound> {
        if !self.registry.remove(&id) {
            return Vec::new();
        }
        leaderboard::rebroadcast(&self.registry, false, now_ms, rng)
    }

    /// Drops every effect whose expiry is at or before `now_ms`.
    ///
    /// Runs on a fixed period from the game loop, on the same serialization
    /// point as message handling.
    pub fn sweep_expired(&mut self, now_ms: u64) {
        for player in self.registry.players_mut() {
            player.effects.retain(|_, &mut expiry| expiry > now_ms);
        }
    }
}
