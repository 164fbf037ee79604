//! # 2048 Game Client Library
//!
//! Client side of a distributed 2048 game. The server owns the board and
//! runs every move; the client finds a server, keeps one connection open,
//! forwards moves and renders whatever state the server pushes back.
//!
//! ## Architecture Overview
//!
//! ### Discovery
//! A directory service answers with either a ready game server address or a
//! not-ready status. [`discovery::DiscoveryClient`] polls it with a fixed
//! delay between attempts and tags every attempt so stale replies are
//! ignored after a cancel.
//!
//! ### Session
//! [`session::ConnectionSession`] owns discovery, the live socket and the
//! reconnect policy. When a connection closes it goes back to discovery on
//! its own. It publishes `connectionMade`, `update`, `connectionError` and
//! `connectionClosed` on an [`events::EventBus`].
//!
//! ### Controller
//! [`game::GameController`] keeps a local replica of the board that only the
//! server's updates change. Moves are sent as-is and never predicted.
//!
//! ## Module Organization
//!
//! - `config`: runtime settings and their defaults
//! - `discovery`: directory client and retry loop
//! - `error`: the crate-wide error type
//! - `events`: named publish/subscribe bus
//! - `game`: replica state and reconciliation
//! - `input`: scripted and random move sources
//! - `network`: the event loop that wires everything together
//! - `rendering`: presentation trait and a text renderer
//! - `session`: connection lifecycle
//! - `transport`: WebSocket dialing behind a trait
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::{ClientConfig, Client, HttpDirectory, TextRenderer, WebSocketDialer};
//! use client::input::{spawn_autoplay, MoveSource};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::default();
//! let directory = Arc::new(HttpDirectory::new(&config.directory_addr, config.request_timeout)?);
//! let dialer = Arc::new(WebSocketDialer::new(config.socket_path.clone()));
//! let mut client = Client::new(&config, directory, dialer, TextRenderer::stdout());
//!
//! let (tx, rx) = tokio::sync::mpsc::channel(16);
//! spawn_autoplay(MoveSource::random(None), config.move_interval, tx);
//! client.run(rx).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod events;
pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
pub mod session;
pub mod transport;

pub use config::ClientConfig;
pub use discovery::{Directory, DiscoveryClient, HttpDirectory};
pub use error::ClientError;
pub use events::{EventBus, SubscriptionId};
pub use game::{Controller, GameController, GameState};
pub use network::Client;
pub use rendering::{RenderMeta, Renderer, TextRenderer};
pub use session::{ConnectionSession, ConnectionState, Connector, SessionEvent};
pub use transport::{Dialer, Transport, TransportEvent, WebSocketDialer};
