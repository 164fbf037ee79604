pub mod grid;
pub mod protocol;

pub use grid::{
    find_farthest_position, moves_available, tile_matches_available, traversal_order, vector_for,
    Direction, FarthestPosition, Grid, Position, Tile, Traversals, Vector,
};
pub use protocol::{
    ClientMove, DirectoryReply, GameStateUpdate, GridSnapshot, ProtocolError, ServerEndpoint,
    STATUS_OK,
};

pub const GRID_SIZE: usize = 4;
pub const DIRECTORY_PORT: u16 = 25340;
pub const DEFAULT_DIRECTORY_ADDR: &str = "http://localhost:25340/";
pub const DISCOVERY_RETRY_DELAY_MS: u64 = 1000;
pub const GAME_SOCKET_PATH: &str = "/abc";
pub const DEFAULT_MOVE_INTERVAL_MS: u64 = 500;
