//! # Clicker Arena Server Library
//!
//! This library provides the authoritative server for the shared-counter
//! clicker arena. It owns the canonical game state — the global counter and
//! every player's score ledger — and broadcasts consistent views of that
//! state to all connected clients in near real time.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! Every score change is decided here. Clients only ever *request* an
//! increment or a purchase; the server validates the request against the
//! cooldown, streak, and power-up rules and tells everyone what actually
//! happened. The global counter is, by construction, the sum of all accepted
//! increments across all players — purchases move score from "held" to
//! "spent" without touching it.
//!
//! ### Player Lifecycle
//! A connection is assigned a fresh player id the moment it is accepted, is
//! registered into the roster on its `register` message, and is removed —
//! score, cooldowns, and effects together — the moment its socket closes.
//! Nothing persists across a disconnect.
//!
//! ### State Broadcasting
//! Accepted increments push the updated counter to every connection, and the
//! leaderboard is re-derived and fanned out whenever the roster or any score
//! changes. A fraction of rebroadcasts include a taunt, delivered on behalf
//! of the current leader to everyone not holding a shield.
//!
//! ## Architecture Design
//!
//! ### Serialized Game Loop
//! All state lives in a single [`game::GameState`] owned by one loop task.
//! Connection tasks parse frames at the boundary and forward typed events
//! over a channel; the loop processes each event to completion before the
//! next, which makes every registry and counter mutation atomic without a
//! single lock. The periodic power-up expiry sweep ticks inside the same
//! loop, so it shares that guarantee.
//!
//! ### WebSocket Transport
//! Clients hold one persistent WebSocket each. Frames are camelCase JSON
//! with a `type` discriminator, parsed exactly once into the closed message
//! enums of the `shared` crate. A malformed or unknown frame is a protocol
//! error: logged, dropped, and never fatal to the connection.
//!
//! ### Fire-and-Forget Sends
//! The game loop never awaits the network. Outbound messages are queued onto
//! per-connection unbounded channels and drained by per-connection writer
//! tasks, so one slow client cannot stall the loop or any other player.
//!
//! ## Module Organization
//!
//! - [`registry`] — the player roster: creation, lookup, removal, and the
//!   ordered snapshot the leaderboard is derived from.
//! - [`game`] — the increment processor and power-up ledger; every state
//!   transition and the outbound dispatches it produces.
//! - [`leaderboard`] — score-ordered projection and taunt fan-out.
//! - [`network`] — the WebSocket gateway and the serialized game loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::bind("127.0.0.1:8080").await?;
//!
//!     // Runs the accept loop and the game loop:
//!     // - assigns each new socket a player id
//!     // - routes register/increment/buyPowerUp into the state engine
//!     // - broadcasts counter and leaderboard updates to everyone
//!     // - expires power-ups on a fixed sweep interval
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod leaderboard;
pub mod network;
pub mod registry;
