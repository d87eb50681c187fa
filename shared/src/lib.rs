use serde::{Deserialize, Serialize};

pub const COOLDOWN_BASE_MS: u64 = 500;
pub const COOLDOWN_BOOSTED_MS: u64 = 1000;
pub const STREAK_WINDOW_MS: u64 = 2000;
pub const STREAK_MILESTONE: u32 = 10;
pub const STREAK_BONUS: f64 = 0.5;
pub const DEMO_STREAK_BONUS: f64 = 1.0;
pub const DOUBLE_CHANCE: f64 = 0.2;
pub const DEMO_DOUBLE_CHANCE: f64 = 0.5;
pub const TAUNT_CHANCE: f64 = 0.3;
pub const SWEEP_INTERVAL_MS: u64 = 1000;

/// The purchasable power-up catalog.
///
/// Serialized by name (camelCase) inside `buyPowerUp` and
/// `powerUpActivated` messages.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PowerUpKind {
    /// Suppresses taunt delivery to the holder. No effect on scoring.
    Shield,
    /// Doubles the computed multiplier on every accepted increment.
    DoubleClick,
    /// Bypasses the cooldown check entirely while active.
    RapidFire,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 3] = [
        PowerUpKind::Shield,
        PowerUpKind::DoubleClick,
        PowerUpKind::RapidFire,
    ];

    /// Score deducted when the power-up is purchased.
    pub fn cost(&self) -> u64 {
        match self {
            PowerUpKind::Shield => 300,
            PowerUpKind::DoubleClick => 500,
            PowerUpKind::RapidFire => 750,
        }
    }

    /// How long the effect stays active after purchase.
    pub fn duration_ms(&self) -> u64 {
        match self {
            PowerUpKind::Shield => 30_000,
            PowerUpKind::DoubleClick => 10_000,
            PowerUpKind::RapidFire => 5_000,
        }
    }
}

/// One row of the broadcast leaderboard, ordered by score descending.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub username: String,
    pub score: u64,
}

/// Messages a client may send. Parsed once at the gateway boundary;
/// anything that does not match one of these variants is a protocol error.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Register {
        username: String,
    },
    #[serde(rename_all = "camelCase")]
    Increment {
        #[serde(default)]
        demo_mode: bool,
    },
    #[serde(rename_all = "camelCase")]
    BuyPowerUp {
        power_up: PowerUpKind,
    },
}

/// Messages the server pushes to clients.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    AssignId {
        player_id: u32,
    },
    TotalCounter {
        total: u64,
    },
    Leaderboard {
        leaderboard: Vec<LeaderboardEntry>,
    },
    Taunt {
        message: String,
    },
    RateLimited,
    #[serde(rename_all = "camelCase")]
    PowerUpActivated {
        power_up: PowerUpKind,
        duration: u64,
    },
    PowerUpError {
        message: String,
    },
    MultiplierGained {
        multiplier: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_wire_format() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"register","username":"ada"}"#).unwrap();
        match msg {
            ClientMessage::Register { username } => assert_eq!(username, "ada"),
            _ => panic!("Wrong message type after deserialization"),
        }
    }

    #[test]
    fn test_increment_demo_mode_defaults_to_false() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"increment"}"#).unwrap();
        match msg {
            ClientMessage::Increment { demo_mode } => assert!(!demo_mode),
            _ => panic!("Wrong message type after deserialization"),
        }

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"increment","demoMode":true}"#).unwrap();
        match msg {
            ClientMessage::Increment { demo_mode } => assert!(demo_mode),
            _ => panic!("Wrong message type after deserialization"),
        }
    }

    #[test]
    fn test_buy_power_up_kind_names() {
        for (wire, kind) in [
            ("shield", PowerUpKind::Shield),
            ("doubleClick", PowerUpKind::DoubleClick),
            ("rapidFire", PowerUpKind::RapidFire),
        ] {
            let raw = format!(r#"{{"type":"buyPowerUp","powerUp":"{}"}}"#, wire);
            let msg: ClientMessage = serde_json::from_str(&raw).unwrap();
            match msg {
                ClientMessage::BuyPowerUp { power_up } => assert_eq!(power_up, kind),
                _ => panic!("Wrong message type after deserialization"),
            }
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result: Result<ClientMessage, _> = serde_json::from_str(r#"{"type":"teleport","x":3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_message_tags_are_camel_case() {
        let assigned = serde_json::to_value(&ServerMessage::AssignId { player_id: 7 }).unwrap();
        assert_eq!(assigned, json!({"type": "assignId", "playerId": 7}));

        let limited = serde_json::to_value(&ServerMessage::RateLimited).unwrap();
        assert_eq!(limited, json!({"type": "rateLimited"}));

        let activated = serde_json::to_value(&ServerMessage::PowerUpActivated {
            power_up: PowerUpKind::Shield,
            duration: 30_000,
        })
        .unwrap();
        assert_eq!(
            activated,
            json!({"type": "powerUpActivated", "powerUp": "shield", "duration": 30000})
        );
    }

    #[test]
    fn test_leaderboard_wire_format() {
        let msg = ServerMessage::Leaderboard {
            leaderboard: vec![
                LeaderboardEntry {
                    username: "ada".to_string(),
                    score: 42,
                },
                LeaderboardEntry {
                    username: "bob".to_string(),
                    score: 7,
                },
            ],
        };

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "leaderboard",
                "leaderboard": [
                    {"username": "ada", "score": 42},
                    {"username": "bob", "score": 7},
                ]
            })
        );
    }

    #[test]
    fn test_catalog_costs_and_durations() {
        assert_eq!(PowerUpKind::Shield.cost(), 300);
        assert_eq!(PowerUpKind::DoubleClick.cost(), 500);
        assert_eq!(PowerUpKind::RapidFire.cost(), 750);

        assert_eq!(PowerUpKind::Shield.duration_ms(), 30_000);
        assert_eq!(PowerUpKind::DoubleClick.duration_ms(), 10_000);
        assert_eq!(PowerUpKind::RapidFire.duration_ms(), 5_000);
    }
}
