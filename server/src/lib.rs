//! # Air Hockey Server Library
//!
//! This library provides the authoritative server for a two-player, real-time
//! paddle-and-ball game played over TCP. The server owns the only valid copy
//! of the match; clients send directional input and render whatever state
//! the server broadcasts.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! A fixed-rate tick loop advances paddles and ball, resolves wall, goal and
//! paddle contacts, keeps score and runs the match clock. Clients never
//! simulate gameplay themselves.
//!
//! ### Session Admission
//! The first two connections become player 1 and player 2. A third
//! concurrent connection is closed immediately without any exchange. A slot
//! freed by a disconnect goes to the next connection; there is no identity
//! across reconnects.
//!
//! ### State Broadcasting
//! After every tick the committed snapshot is encoded once and queued for
//! each session. Every session has a bounded outbound queue; a peer that
//! falls too far behind is disconnected instead of stalling the loop.
//!
//! ## Architecture Design
//!
//! ### Message Passing Into a Single Writer
//! Each session gets a reader task that decodes newline-delimited JSON
//! records and forwards `{"direction": -1 | 0 | 1}` commands over a channel.
//! The tick loop drains that channel at the start of each tick and is the
//! sole mutator of the match. A burst of inputs only ever exposes the most
//! recent direction to the simulation.
//!
//! ### Immutable Snapshots
//! [`game::MatchState`] is a plain `Copy` value. Each tick produces a new
//! snapshot, which is published on a watch channel and serialized for the
//! broadcast without holding any lock during network I/O.
//!
//! ### Match Lifecycle
//! `Waiting` until two players are registered, `Running` while both stay,
//! back to `Waiting` (ball frozen) if one leaves, and `GameOver` once the
//! clock runs out. `GameOver` is terminal; a new match needs a new process.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! Session registry: slot assignment, slot lookup for input routing,
//! outbound queues for broadcast and idempotent removal.
//!
//! ### Config Module (`config`)
//! Runtime settings: bind address, tick rate, match length, queue size.
//!
//! ### Game Module (`game`)
//! Match snapshot, per-slot inputs and the per-tick state machine.
//!
//! ### Network Module (`network`)
//! Listener, per-session reader and writer tasks, tick loop, broadcaster.
//!
//! ### Physics Module (`physics`)
//! Ball, paddle and "C"-shaped goal geometry.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let config = ServerConfig {
//!         port: 9000,
//!         ..ServerConfig::default()
//!     };
//!
//!     // Binding fails fast if the port is taken.
//!     let server = Server::bind(config).await?;
//!
//!     // Accepts players and runs the match at the configured tick rate.
//!     server.run().await
//! }
//! ```
//!
//! ## Known Limitations
//!
//! Ball motion is integrated in a single step per tick, so at very high
//! speeds it could tunnel through thin geometry. A ball that somehow leaves
//! the field is served again from the center rather than reported.

pub mod client_manager;
pub mod config;
pub mod game;
pub mod network;
pub mod physics;
