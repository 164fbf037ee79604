use shared::ProtocolError;
use thiserror::Error;

/// Everything that can go wrong inside the client.
///
/// Only `TransportUnavailable` and `RestartRejected` are meant for the user;
/// the rest are absorbed by the discovery and reconnection loops.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no socket transport is available in this environment")]
    TransportUnavailable,
    #[error("directory is not ready (status {0:?})")]
    DiscoveryUnready(String),
    #[error("directory reply could not be decoded: {0}")]
    DiscoveryMalformed(String),
    #[error("directory request failed: {0}")]
    DirectoryUnreachable(String),
    #[error("connection error: {0}")]
    ConnectionError(String),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("not connected to a game server")]
    NotConnected,
    #[error("restarting the game is not supported")]
    RestartRejected,
    #[error("malformed update from server: {0}")]
    MalformedUpdate(String),
    #[error("invalid move script: {0}")]
    InvalidMoves(String),
    #[error("invalid address: {0}")]
    InvalidEndpoint(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("could not encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Failures that should be shown to the user rather than retried.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            ClientError::TransportUnavailable | ClientError::RestartRejected
        )
    }
}
