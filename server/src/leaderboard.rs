//! Leaderboard derivation and taunt fan-out

use rand::seq::SliceRandom;
use rand::Rng;

use crate::game::Outbound;
use crate::registry::PlayerRegistry;
use shared::{LeaderboardEntry, PowerUpKind, ServerMessage};

/// Phrases delivered on behalf of the current leader. Picked uniformly at
/// random per rebroadcast.
pub const TAUNTS: &[&str] = &[
    "my cooldown lasts longer than your streaks.",
    "is that lag, or are you just slow?",
    "I could win this with one finger.",
    "the counter barely notices you.",
    "keep clicking, it's adorable.",
    "second place is just first loser.",
    "you call that a click?",
    "wake me up when someone catches up.",
];

/// Derives the broadcast view of all players: score descending, ties kept in
/// registry order.
pub fn derive(registry: &PlayerRegistry) -> Vec<LeaderboardEntry> {
    let mut players = registry.snapshot();
    // Stable sort over the id-ordered snapshot keeps ties deterministic.
    players.sort_by(|a, b| b.score.cmp(&a.score));

    players
        .iter()
        .map(|p| LeaderboardEntry {
            username: p.username.clone(),
            score: p.score,
        })
        .collect()
}

/// Builds the dispatches for one leaderboard rebroadcast
///
/// Every connected client receives the sorted board. When `with_taunt` is set
/// and at least one player exists, a phrase addressed as the top player is
/// additionally delivered to each player without an active shield. Shield
/// eligibility is evaluated against the single `now_ms` of this call, so a
/// player cannot flicker in and out of eligibility mid-broadcast.
pub fn rebroadcast(
    registry: &PlayerRegistry,
    with_taunt: bool,
    now_ms: u64,
    rng: &mut impl Rng,
) -> Vec<Outbound> {
    let board = derive(registry);
    let mut out = vec![Outbound::ToAll(ServerMessage::Leaderboard {
        leaderboard: board.clone(),
    })];

    if with_taunt {
        if let (Some(top), Some(phrase)) = (board.first(), TAUNTS.choose(rng)) {
            let message = format!("{}: {}", top.username, phrase);
            for player in registry.snapshot() {
                if !player.effect_active(PowerUpKind::Shield, now_ms) {
                    out.push(Outbound::ToPlayer(
                        player.id,
                        ServerMessage::Taunt {
                            message: message.clone(),
                        },
                    ));
                }
            }
        }
    }

    out
}
