//! Connection session: discovery, one live socket, and reconnection.
//!
//! All I/O completes on spawned tasks that post a [`SessionMessage`] back to
//! the owner's event loop; the owner hands each message to
//! [`ConnectionSession::handle`] one at a time. Socket messages carry the
//! epoch of the connection they belong to, and anything from an older epoch
//! is dropped, so a superseded socket can never reach the controller.

use crate::config::ClientConfig;
use crate::discovery::{Directory, DiscoveryClient, DiscoveryMessage};
use crate::error::ClientError;
use crate::events::{EventBus, SubscriptionId};
use crate::transport::{Dialer, Transport, TransportEvent};
use log::{debug, error, info, warn};
use shared::{ClientMove, GameStateUpdate, ServerEndpoint};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const CONNECTION_MADE: &str = "connectionMade";
pub const UPDATE: &str = "update";
pub const CONNECTION_ERROR: &str = "connectionError";
pub const CONNECTION_CLOSED: &str = "connectionClosed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Discovering,
    Connecting,
    Connected,
}

/// Payload published on the session's event bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ConnectionMade,
    Update(GameStateUpdate),
    ConnectionError(String),
    ConnectionClosed,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::ConnectionMade => CONNECTION_MADE,
            SessionEvent::Update(_) => UPDATE,
            SessionEvent::ConnectionError(_) => CONNECTION_ERROR,
            SessionEvent::ConnectionClosed => CONNECTION_CLOSED,
        }
    }
}

/// Completions posted back to the event loop by session tasks.
#[derive(Debug)]
pub enum SessionMessage {
    Discovery(DiscoveryMessage),
    Opened { epoch: u64, transport: Transport },
    DialFailed { epoch: u64, error: ClientError },
    Transport { epoch: u64, event: TransportEvent },
}

impl From<DiscoveryMessage> for SessionMessage {
    fn from(message: DiscoveryMessage) -> Self {
        SessionMessage::Discovery(message)
    }
}

/// Capability the game controller needs from a connection.
pub trait Connector {
    fn connect(&mut self, endpoint: ServerEndpoint) -> Result<(), ClientError>;

    /// Fails with [`ClientError::NotConnected`] unless a socket is open.
    fn send(&mut self, message: &ClientMove) -> Result<(), ClientError>;

    fn on<F>(&mut self, event: &str, handler: F) -> SubscriptionId
    where
        F: FnMut(&SessionEvent) + Send + 'static;
}

struct ActiveSocket {
    outgoing: mpsc::UnboundedSender<String>,
    pump: JoinHandle<()>,
}

pub struct ConnectionSession<D, T> {
    discovery: DiscoveryClient<D, SessionMessage>,
    dialer: Arc<T>,
    state: ConnectionState,
    epoch: u64,
    socket: Option<ActiveSocket>,
    dial_task: Option<JoinHandle<()>>,
    bus: EventBus<SessionEvent>,
    torn_down: bool,
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl<D, T> ConnectionSession<D, T>
where
    D: Directory,
    T: Dialer,
{
    /// Creates an idle session and the receiver its tasks report to.
    pub fn new(
        config: &ClientConfig,
        directory: Arc<D>,
        dialer: Arc<T>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let discovery = DiscoveryClient::new(
            directory,
            config.retry_delay,
            config.request_timeout,
            tx.clone(),
        );

        let session = Self {
            discovery,
            dialer,
            state: ConnectionState::Disconnected,
            epoch: 0,
            socket: None,
            dial_task: None,
            bus: EventBus::new(),
            torn_down: false,
            tx,
        };

        (session, rx)
    }

    /// Begins discovering a game server.
    pub fn start(&mut self) -> Result<(), ClientError> {
        self.ensure_transport()?;
        self.torn_down = false;
        self.enter_discovery();
        Ok(())
    }

    pub fn handle(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Discovery(message) => {
                let Some(endpoint) = self.discovery.handle(message) else {
                    return;
                };
                if self.state != ConnectionState::Discovering {
                    debug!("Ignoring discovered endpoint {} in state {:?}", endpoint, self.state);
                    return;
                }
                if let Err(e) = self.connect(endpoint) {
                    error!("Cannot connect to discovered server: {}", e);
                }
            }

            SessionMessage::Opened { epoch, transport } => {
                if epoch != self.epoch || self.state != ConnectionState::Connecting {
                    debug!("Dropping superseded connection from epoch {}", epoch);
                    return;
                }
                self.dial_task = None;
                self.attach(transport);
                self.state = ConnectionState::Connected;
                info!("Connection to the game server open");
                self.emit(SessionEvent::ConnectionMade);
            }

            SessionMessage::DialFailed { epoch, error } => {
                if epoch != self.epoch || self.state != ConnectionState::Connecting {
                    debug!("Ignoring dial failure from epoch {}", epoch);
                    return;
                }
                self.dial_task = None;
                warn!("Could not open connection to game server: {}", error);
                self.emit(SessionEvent::ConnectionError(error.to_string()));
                self.handle_close();
            }

            SessionMessage::Transport { epoch, event } => {
                if epoch != self.epoch || self.state != ConnectionState::Connected {
                    debug!("Ignoring {:?} from superseded socket (epoch {})", event, epoch);
                    return;
                }
                match event {
                    TransportEvent::Message(text) => {
                        match serde_json::from_str::<GameStateUpdate>(&text) {
                            Ok(update) => self.emit(SessionEvent::Update(update)),
                            Err(e) => warn!("Ignoring undecodable message from game server: {}", e),
                        }
                    }
                    TransportEvent::Error(reason) => {
                        warn!("Error from connection with game server: {}", reason);
                        self.emit(SessionEvent::ConnectionError(reason));
                    }
                    TransportEvent::Closed => self.handle_close(),
                }
            }
        }
    }

    /// Tears the session down for good; no reconnection follows.
    pub fn shutdown(&mut self) {
        self.torn_down = true;
        self.discovery.cancel();
        self.detach();
        self.epoch += 1;
        self.state = ConnectionState::Disconnected;
        info!("Session shut down");
    }

    pub fn off(&mut self, event: &str, id: SubscriptionId) -> bool {
        self.bus.off(event, id)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_retry_pending(&self) -> bool {
        self.discovery.is_retry_pending()
    }

    fn ensure_transport(&self) -> Result<(), ClientError> {
        if self.dialer.is_available() {
            Ok(())
        } else {
            Err(ClientError::TransportUnavailable)
        }
    }

    fn enter_discovery(&mut self) {
        self.state = ConnectionState::Discovering;
        self.discovery.discover();
    }

    fn handle_close(&mut self) {
        self.detach();
        self.state = ConnectionState::Disconnected;
        info!("Connection to the game server closed");
        self.emit(SessionEvent::ConnectionClosed);

        if !self.torn_down {
            info!("Looking for a game server again");
            self.enter_discovery();
        }
    }

    fn attach(&mut self, transport: Transport) {
        let Transport {
            outgoing,
            mut incoming,
        } = transport;
        let epoch = self.epoch;
        let tx = self.tx.clone();

        let pump = tokio::spawn(async move {
            loop {
                let event = incoming.recv().await.unwrap_or(TransportEvent::Closed);
                let closed = event == TransportEvent::Closed;
                if tx.send(SessionMessage::Transport { epoch, event }).is_err() || closed {
                    break;
                }
            }
        });

        self.socket = Some(ActiveSocket { outgoing, pump });
    }

    /// Drops the current socket and any dial in progress.
    fn detach(&mut self) {
        if let Some(dial) = self.dial_task.take() {
            dial.abort();
        }
        if let Some(socket) = self.socket.take() {
            socket.pump.abort();
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        self.bus.emit(event.name(), &event);
    }
}

impl<D, T> Connector for ConnectionSession<D, T>
where
    D: Directory,
    T: Dialer,
{
    fn connect(&mut self, endpoint: ServerEndpoint) -> Result<(), ClientError> {
        self.ensure_transport()?;
        self.torn_down = false;
        self.discovery.cancel();
        self.detach();
        self.epoch += 1;
        self.state = ConnectionState::Connecting;
        info!("Connecting to game server {}", endpoint);

        let epoch = self.epoch;
        let dialer = Arc::clone(&self.dialer);
        let tx = self.tx.clone();

        self.dial_task = Some(tokio::spawn(async move {
            let message = match dialer.dial(&endpoint).await {
                Ok(transport) => SessionMessage::Opened { epoch, transport },
                Err(error) => SessionMessage::DialFailed { epoch, error },
            };
            let _ = tx.send(message);
        }));

        Ok(())
    }

    fn send(&mut self, message: &ClientMove) -> Result<(), ClientError> {
        if self.state != ConnectionState::Connected {
            return Err(ClientError::NotConnected);
        }
        let socket = self.socket.as_ref().ok_or(ClientError::NotConnected)?;

        let payload = serde_json::to_string(message)?;
        debug!("Sending {}", payload);
        socket
            .outgoing
            .send(payload)
            .map_err(|_| ClientError::NotConnected)
    }

    fn on<F>(&mut self, event: &str, handler: F) -> SubscriptionId
    where
        F: FnMut(&SessionEvent) + Send + 'static,
    {
        self.bus.on(event, handler)
    }
}

impl<D, T> Drop for ConnectionSession<D, T> {
    fn drop(&mut self) {
        if let Some(dial) = self.dial_task.take() {
            dial.abort();
        }
        if let Some(socket) = self.socket.take() {
            socket.pump.abort();
        }
    }
}
