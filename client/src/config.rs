//! Client configuration, passed explicitly at construction.

use shared::{
    ServerEndpoint, DEFAULT_DIRECTORY_ADDR, DEFAULT_MOVE_INTERVAL_MS, DISCOVERY_RETRY_DELAY_MS,
    GAME_SOCKET_PATH, GRID_SIZE,
};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Directory service URL, e.g. `http://localhost:25340/`.
    pub directory_addr: String,
    /// Game server to use for the first connection instead of asking the directory.
    pub server: Option<ServerEndpoint>,
    pub grid_size: usize,
    /// Fixed delay between directory attempts.
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    pub socket_path: String,
    pub move_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            directory_addr: DEFAULT_DIRECTORY_ADDR.to_string(),
            server: None,
            grid_size: GRID_SIZE,
            retry_delay: Duration::from_millis(DISCOVERY_RETRY_DELAY_MS),
            request_timeout: Duration::from_secs(5),
            socket_path: GAME_SOCKET_PATH.to_string(),
            move_interval: Duration::from_millis(DEFAULT_MOVE_INTERVAL_MS),
        }
    }
}
