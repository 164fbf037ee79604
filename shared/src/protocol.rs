//! Messages exchanged with the directory service and the game server.
//!
//! Field names follow the server's JSON encoding (`Status`, `Hostport`,
//! `Direction`, `Score`, `Grid`, `Won`, `Over`).

use crate::grid::Direction;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Directory status meaning a game server has been assigned.
pub const STATUS_OK: &str = "OK";

/// Board as sent by the server: `snapshot[y][x]`, zero for empty cells.
pub type GridSnapshot = Vec<Vec<u32>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid direction code {0}")]
    InvalidDirection(u8),
    #[error("invalid host:port {0:?}")]
    InvalidEndpoint(String),
    #[error("grid snapshot has {found} cells along an axis, expected {expected}")]
    GridDimension { expected: usize, found: usize },
}

/// Client → server move command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientMove {
    pub direction: u8,
}

impl From<Direction> for ClientMove {
    fn from(direction: Direction) -> Self {
        Self {
            direction: direction.code(),
        }
    }
}

/// Server → client authoritative game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameStateUpdate {
    pub score: u64,
    pub grid: GridSnapshot,
    pub won: bool,
    pub over: bool,
}

/// Body returned by the directory service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DirectoryReply {
    pub status: String,
    #[serde(default)]
    pub hostport: String,
}

impl DirectoryReply {
    pub fn is_ready(&self) -> bool {
        self.status == STATUS_OK
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
}

impl ServerEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// WebSocket URL for this endpoint, `path` starting with `/`.
    pub fn websocket_url(&self, path: &str) -> String {
        format!("ws://{}:{}{}", self.host, self.port, path)
    }
}

impl FromStr for ServerEndpoint {
    type Err = ProtocolError;

    fn from_str(hostport: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidEndpoint(hostport.to_string());

        let (host, port) = hostport.trim().rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
