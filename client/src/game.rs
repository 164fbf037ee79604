//! Local replica of the server-authoritative game.
//!
//! The replica only changes in `setup` and `update`. Moves are forwarded to
//! the server untouched and their effect shows up in a later update.

use crate::error::ClientError;
use crate::rendering::{RenderMeta, Renderer};
use crate::session::Connector;
use log::{debug, info, warn};
use shared::{ClientMove, Direction, GameStateUpdate, Grid};

pub const RESTART_NOTICE: &str =
    "Restarting is not supported; a new round starts automatically after a win.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub grid: Grid,
    pub score: u64,
    /// Highest score seen during this process; never decreases.
    pub best_score: u64,
    pub over: bool,
    pub won: bool,
    pub keep_playing: bool,
}

impl GameState {
    pub fn new(size: usize) -> Self {
        Self {
            grid: Grid::new(size),
            score: 0,
            best_score: 0,
            over: false,
            won: false,
            keep_playing: false,
        }
    }

    /// Clears the round but keeps the best score.
    pub fn reset_round(&mut self) {
        self.grid = Grid::new(self.grid.size());
        self.score = 0;
        self.over = false;
        self.won = false;
        self.keep_playing = false;
    }

    /// Lost, or won without choosing to keep playing.
    pub fn is_game_terminated(&self) -> bool {
        self.over || (self.won && !self.keep_playing)
    }

    pub fn render_meta(&self) -> RenderMeta {
        RenderMeta {
            score: self.score,
            over: self.over,
            won: self.won,
            best_score: self.best_score,
            terminated: self.is_game_terminated(),
        }
    }
}

/// What the runtime drives in response to session events and input.
pub trait Controller {
    fn setup(&mut self);

    fn make_move<C: Connector>(
        &mut self,
        direction: Direction,
        connector: &mut C,
    ) -> Result<(), ClientError>;

    fn update(&mut self, message: &GameStateUpdate) -> Result<(), ClientError>;
}

pub struct GameController<R> {
    size: usize,
    state: GameState,
    renderer: R,
}

impl<R: Renderer> GameController<R> {
    pub fn new(size: usize, renderer: R) -> Self {
        Self {
            size,
            state: GameState::new(size),
            renderer,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Restart is not part of the protocol: show the notice and do nothing else.
    pub fn restart(&mut self) -> Result<(), ClientError> {
        self.renderer.notify(RESTART_NOTICE);
        Err(ClientError::RestartRejected)
    }

    pub fn notify(&mut self, notice: &str) {
        self.renderer.notify(notice);
    }

    fn actuate(&mut self) {
        let meta = self.state.render_meta();
        self.renderer.render(&self.state.grid, &meta);
    }
}

impl<R: Renderer> Controller for GameController<R> {
    fn setup(&mut self) {
        info!("Setting up a fresh {}x{} board", self.size, self.size);
        self.state.reset_round();
        self.actuate();
    }

    fn make_move<C: Connector>(
        &mut self,
        direction: Direction,
        connector: &mut C,
    ) -> Result<(), ClientError> {
        debug!("Sending move {:?}", direction);
        connector.send(&ClientMove::from(direction))
    }

    fn update(&mut self, message: &GameStateUpdate) -> Result<(), ClientError> {
        let grid = Grid::from_snapshot(self.size, &message.grid)
            .map_err(|e| ClientError::MalformedUpdate(e.to_string()))?;

        self.state.grid = grid;
        self.state.score = message.score;
        self.state.best_score = self.state.best_score.max(message.score);

        if message.won {
            info!("Round won with score {}", message.score);
            self.state.won = true;
            self.actuate();
            self.state.reset_round();
        } else if message.over {
            info!("Round lost with score {}", message.score);
            self.state.over = true;
            self.actuate();
        }

        self.actuate();
        Ok(())
    }
}

/// Logs rejected updates instead of propagating them; the session keeps running.
pub fn apply_update<R: Renderer>(controller: &mut GameController<R>, message: &GameStateUpdate) {
    if let Err(e) = controller.update(message) {
        warn!("Ignoring update: {}", e);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::events::SubscriptionId;
    use crate::session::SessionEvent;
    use parking_lot::Mutex;
    use shared::{GridSnapshot, Position, ServerEndpoint};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Frame {
        Board(GridSnapshot, RenderMeta),
        Notice(String),
    }

    /// Renderer that records every frame into a shared log.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingRenderer {
        pub frames: Arc<Mutex<Vec<Frame>>>,
    }

    impl RecordingRenderer {
        pub(crate) fn boards(&self) -> Vec<(GridSnapshot, RenderMeta)> {
            self.frames
                .lock()
                .iter()
                .filter_map(|frame| match frame {
                    Frame::Board(grid, meta) => Some((grid.clone(), *meta)),
                    Frame::Notice(_) => None,
                })
                .collect()
        }
    }

    impl Renderer for RecordingRenderer {
        fn render(&mut self, grid: &Grid, meta: &RenderMeta) {
            self.frames.lock().push(Frame::Board(grid.to_snapshot(), *meta));
        }

        fn notify(&mut self, notice: &str) {
            self.frames.lock().push(Frame::Notice(notice.to_string()));
        }
    }

    #[derive(Default)]
    struct RecordingConnector {
        connected: bool,
        sent: Vec<ClientMove>,
    }

    impl Connector for RecordingConnector {
        fn connect(&mut self, _endpoint: ServerEndpoint) -> Result<(), ClientError> {
            self.connected = true;
            Ok(())
        }

        fn send(&mut self, message: &ClientMove) -> Result<(), ClientError> {
            if !self.connected {
                return Err(ClientError::NotConnected);
            }
            self.sent.push(*message);
            Ok(())
        }

        fn on<F>(&mut self, _event: &str, _handler: F) -> SubscriptionId
        where
            F: FnMut(&SessionEvent) + Send + 'static,
        {
            unimplemented!("controller never subscribes")
        }
    }

    fn snapshot(rows: [[u32; 4]; 4]) -> GridSnapshot {
        rows.iter().map(|row| row.to_vec()).collect()
    }

    fn update(score: u64, grid: GridSnapshot, won: bool, over: bool) -> GameStateUpdate {
        GameStateUpdate {
            score,
            grid,
            won,
            over,
        }
    }

    fn controller() -> (GameController<RecordingRenderer>, RecordingRenderer) {
        let renderer = RecordingRenderer::default();
        (GameController::new(4, renderer.clone()), renderer)
    }

    #[test]
    fn test_setup_renders_empty_board() {
        let (mut controller, renderer) = controller();
        controller.setup();

        let boards = renderer.boards();
        assert_eq!(boards.len(), 1);
        assert_eq!(boards[0].0, vec![vec![0; 4]; 4]);
        assert_eq!(boards[0].1, RenderMeta::default());
        assert!(controller.state().grid.is_empty());
    }

    #[test]
    fn test_update_raises_best_score() {
        let (mut controller, renderer) = controller();
        controller.setup();
        controller
            .update(&update(80, snapshot([[2, 0, 0, 0]; 4]), false, false))
            .unwrap();
        assert_eq!(controller.state().best_score, 80);

        let grid = snapshot([
            [2, 4, 0, 0],
            [0, 0, 8, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 64],
        ]);
        controller
            .update(&update(120, grid.clone(), false, false))
            .unwrap();

        let state = controller.state();
        assert_eq!(state.score, 120);
        assert_eq!(state.best_score, 120);
        assert_eq!(state.grid.to_snapshot(), grid);
        assert_eq!(
            state.grid.cell_content(Position::new(3, 3)).map(|t| t.value),
            Some(64)
        );

        // setup + one render per plain update
        assert_eq!(renderer.boards().len(), 3);
    }

    #[test]
    fn test_best_score_never_decreases() {
        let (mut controller, _) = controller();
        controller.setup();
        controller
            .update(&update(500, snapshot([[0; 4]; 4]), false, false))
            .unwrap();
        controller
            .update(&update(12, snapshot([[0; 4]; 4]), false, false))
            .unwrap();
        controller.setup();

        assert_eq!(controller.state().score, 0);
        assert_eq!(controller.state().best_score, 500);
    }

    #[test]
    fn test_won_update_renders_then_starts_new_round() {
        let (mut controller, renderer) = controller();
        controller.setup();

        let grid = snapshot([
            [2048, 0, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 2],
        ]);
        controller
            .update(&update(20000, grid.clone(), true, false))
            .unwrap();

        let boards = renderer.boards();
        assert_eq!(boards.len(), 3);

        let (won_grid, won_meta) = &boards[1];
        assert_eq!(won_grid, &grid);
        assert!(won_meta.won);
        assert_eq!(won_meta.score, 20000);
        assert!(won_meta.terminated);

        let (reset_grid, reset_meta) = &boards[2];
        assert_eq!(reset_grid, &vec![vec![0; 4]; 4]);
        assert_eq!(reset_meta.score, 0);
        assert!(!reset_meta.won);
        assert!(!reset_meta.over);
        assert_eq!(reset_meta.best_score, 20000);

        let state = controller.state();
        assert!(state.grid.is_empty());
        assert!(!state.won && !state.over && !state.keep_playing);
    }

    #[test]
    fn test_over_update_does_not_reset() {
        let (mut controller, renderer) = controller();
        controller.setup();

        let grid = snapshot([
            [2, 4, 2, 4],
            [4, 2, 4, 2],
            [2, 4, 2, 4],
            [4, 2, 4, 2],
        ]);
        controller
            .update(&update(300, grid.clone(), false, true))
            .unwrap();

        let boards = renderer.boards();
        assert_eq!(boards.len(), 3);
        assert!(boards[1].1.over);
        assert_eq!(boards[2], boards[1]);

        let state = controller.state();
        assert!(state.over);
        assert_eq!(state.score, 300);
        assert_eq!(state.grid.to_snapshot(), grid);
    }

    #[test]
    fn test_malformed_update_leaves_replica_untouched() {
        let (mut controller, renderer) = controller();
        controller.setup();
        let before = controller.state().clone();

        let result = controller.update(&update(10, vec![vec![2, 2]; 2], false, false));
        assert!(matches!(result, Err(ClientError::MalformedUpdate(_))));
        assert_eq!(controller.state(), &before);
        assert_eq!(renderer.boards().len(), 1);

        apply_update(&mut controller, &update(10, vec![], false, false));
        assert_eq!(controller.state(), &before);
    }

    #[test]
    fn test_move_sends_without_touching_replica() {
        let (mut controller, renderer) = controller();
        controller.setup();
        controller
            .update(&update(4, snapshot([[2, 2, 0, 0]; 4]), false, false))
            .unwrap();
        let before = controller.state().clone();
        let frames_before = renderer.frames.lock().len();

        let mut connector = RecordingConnector {
            connected: true,
            ..Default::default()
        };
        let direction = Direction::from_code(1).unwrap();
        controller.make_move(direction, &mut connector).unwrap();

        assert_eq!(connector.sent, vec![ClientMove { direction: 1 }]);
        assert_eq!(
            serde_json::to_string(&connector.sent[0]).unwrap(),
            r#"{"Direction":1}"#
        );
        assert_eq!(controller.state(), &before);
        assert_eq!(renderer.frames.lock().len(), frames_before);
    }

    #[test]
    fn test_move_while_disconnected_fails() {
        let (mut controller, _) = controller();
        let mut connector = RecordingConnector::default();
        let result = controller.make_move(Direction::Up, &mut connector);
        assert!(matches!(result, Err(ClientError::NotConnected)));
    }

    #[test]
    fn test_restart_is_rejected_with_notice() {
        let (mut controller, renderer) = controller();
        controller.setup();
        let before = controller.state().clone();

        assert!(matches!(
            controller.restart(),
            Err(ClientError::RestartRejected)
        ));
        assert_eq!(controller.state(), &before);
        assert_eq!(
            renderer.frames.lock().last(),
            Some(&Frame::Notice(RESTART_NOTICE.to_string()))
        );
    }
}
