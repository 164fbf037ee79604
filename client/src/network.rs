use crate::config::ClientConfig;
use crate::discovery::Directory;
use crate::error::ClientError;
use crate::game::{apply_update, Controller, GameController};
use crate::input::InputCommand;
use crate::rendering::Renderer;
use crate::session::{
    ConnectionSession, Connector, SessionEvent, SessionMessage, CONNECTION_CLOSED,
    CONNECTION_ERROR, CONNECTION_MADE, UPDATE,
};
use crate::transport::Dialer;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use shared::ServerEndpoint;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const TRANSPORT_UNAVAILABLE_NOTICE: &str =
    "This environment cannot open WebSocket connections, so the game server is unreachable.";

/// Event loop tying the connection session to the game controller.
///
/// Session tasks, the input source and Ctrl-C are multiplexed onto one
/// `select!` loop, so every state change happens on this task.
pub struct Client<D, T, R> {
    session: ConnectionSession<D, T>,
    session_rx: mpsc::UnboundedReceiver<SessionMessage>,
    controller: Arc<Mutex<GameController<R>>>,
    server: Option<ServerEndpoint>,
}

impl<D, T, R> Client<D, T, R>
where
    D: Directory,
    T: Dialer,
    R: Renderer,
{
    pub fn new(config: &ClientConfig, directory: Arc<D>, dialer: Arc<T>, renderer: R) -> Self {
        let (mut session, session_rx) = ConnectionSession::new(config, directory, dialer);
        let controller = Arc::new(Mutex::new(GameController::new(config.grid_size, renderer)));

        let made = Arc::clone(&controller);
        session.on(CONNECTION_MADE, move |_| made.lock().setup());

        let updates = Arc::clone(&controller);
        session.on(UPDATE, move |event| {
            if let SessionEvent::Update(message) = event {
                apply_update(&mut updates.lock(), message);
            }
        });

        session.on(CONNECTION_ERROR, |event| {
            if let SessionEvent::ConnectionError(reason) = event {
                warn!("Connection error: {}", reason);
            }
        });
        session.on(CONNECTION_CLOSED, |_| info!("Disconnected from game server"));

        Client {
            session,
            session_rx,
            controller,
            server: config.server.clone(),
        }
    }

    pub fn controller(&self) -> Arc<Mutex<GameController<R>>> {
        Arc::clone(&self.controller)
    }

    pub fn session(&self) -> &ConnectionSession<D, T> {
        &self.session
    }

    fn begin(&mut self) -> Result<(), ClientError> {
        match self.server.clone() {
            Some(endpoint) => {
                info!("Skipping discovery, using {}", endpoint);
                self.session.connect(endpoint)
            }
            None => self.session.start(),
        }
    }

    fn handle_input(&mut self, command: InputCommand) {
        match command {
            InputCommand::Move(direction) => {
                let result = self
                    .controller
                    .lock()
                    .make_move(direction, &mut self.session);
                if let Err(e) = result {
                    warn!("Dropping move {:?}: {}", direction, e);
                }
            }
            InputCommand::Restart => {
                if let Err(e) = self.controller.lock().restart() {
                    debug!("Restart ignored: {}", e);
                }
            }
            InputCommand::Quit => {}
        }
    }

    /// Runs until the input source quits or closes, or Ctrl-C arrives.
    pub async fn run(&mut self, mut input: mpsc::Receiver<InputCommand>) -> Result<(), ClientError> {
        if let Err(e) = self.begin() {
            if e.is_user_visible() {
                self.controller.lock().notify(TRANSPORT_UNAVAILABLE_NOTICE);
            }
            error!("Cannot start client: {}", e);
            return Err(e);
        }

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                message = self.session_rx.recv() => {
                    if let Some(message) = message {
                        self.session.handle(message);
                    }
                },

                command = input.recv() => match command {
                    Some(InputCommand::Quit) | None => {
                        info!("Input finished, leaving");
                        break;
                    }
                    Some(command) => self.handle_input(command),
                },

                _ = &mut ctrl_c => {
                    info!("Interrupted, leaving");
                    break;
                },
            }
        }

        self.session.shutdown();
        Ok(())
    }
}
