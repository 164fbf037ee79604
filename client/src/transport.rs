//! Socket transport to the game server.
//!
//! A [`Dialer`] opens a connection and hands back a [`Transport`]: a pair of
//! channels, one for outgoing text frames and one for inbound events. The
//! session never sees the socket itself, which keeps it testable with plain
//! channels and lets the WebSocket pumps die with the channels.

use crate::error::ClientError;
use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use shared::ServerEndpoint;
use std::future::Future;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(String),
    Error(String),
    Closed,
}

/// Open connection. Dropping `outgoing` closes the socket.
#[derive(Debug)]
pub struct Transport {
    pub outgoing: mpsc::UnboundedSender<String>,
    pub incoming: mpsc::UnboundedReceiver<TransportEvent>,
}

pub trait Dialer: Send + Sync + 'static {
    /// Whether this environment can open sockets at all.
    fn is_available(&self) -> bool {
        true
    }

    fn dial(
        &self,
        endpoint: &ServerEndpoint,
    ) -> impl Future<Output = Result<Transport, ClientError>> + Send;
}

/// Dials `ws://host:port<path>` with tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct WebSocketDialer {
    path: String,
}

impl WebSocketDialer {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    async fn open(&self, endpoint: &ServerEndpoint) -> Result<Transport, ClientError> {
        let url = endpoint.websocket_url(&self.path);
        debug!("Opening {}", url);

        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
        let (mut write, mut read) = stream.split();

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<String>();
        let (incoming_tx, incoming) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(text) = outgoing_rx.recv().await {
                if let Err(e) = write.send(Message::Text(text)).await {
                    warn!("Failed to write to game server: {}", e);
                    break;
                }
            }
            let _ = write.close().await;
        });

        tokio::spawn(async move {
            loop {
                let event = match read.next().await {
                    Some(Ok(Message::Text(text))) => TransportEvent::Message(text),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => TransportEvent::Message(text),
                        Err(_) => TransportEvent::Error("binary frame is not utf-8".to_string()),
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        let _ = incoming_tx.send(TransportEvent::Closed);
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        let _ = incoming_tx.send(TransportEvent::Error(e.to_string()));
                        let _ = incoming_tx.send(TransportEvent::Closed);
                        break;
                    }
                };

                if incoming_tx.send(event).is_err() {
                    break;
                }
            }
        });

        Ok(Transport { outgoing, incoming })
    }
}

impl Dialer for WebSocketDialer {
    fn dial(
        &self,
        endpoint: &ServerEndpoint,
    ) -> impl Future<Output = Result<Transport, ClientError>> + Send {
        self.open(endpoint)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Server side of a fake connection.
    pub(crate) struct FakePeer {
        pub endpoint: ServerEndpoint,
        pub sent: mpsc::UnboundedReceiver<String>,
        pub events: mpsc::UnboundedSender<TransportEvent>,
    }

    /// Dialer backed by in-memory channels; each dial hands its peer to the test.
    pub(crate) struct FakeDialer {
        available: bool,
        failures: Mutex<VecDeque<String>>,
        peers: mpsc::UnboundedSender<FakePeer>,
        dials: Mutex<Vec<ServerEndpoint>>,
    }

    impl FakeDialer {
        pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakePeer>) {
            let (peers, peers_rx) = mpsc::unbounded_channel();
            let dialer = Arc::new(Self {
                available: true,
                failures: Mutex::new(VecDeque::new()),
                peers,
                dials: Mutex::new(Vec::new()),
            });
            (dialer, peers_rx)
        }

        pub(crate) fn unavailable() -> Arc<Self> {
            let (peers, _) = mpsc::unbounded_channel();
            Arc::new(Self {
                available: false,
                failures: Mutex::new(VecDeque::new()),
                peers,
                dials: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn fail_next(&self, reason: &str) {
            self.failures.lock().push_back(reason.to_string());
        }

        pub(crate) fn dials(&self) -> Vec<ServerEndpoint> {
            self.dials.lock().clone()
        }

        fn connect(&self, endpoint: &ServerEndpoint) -> Result<Transport, ClientError> {
            self.dials.lock().push(endpoint.clone());
            if let Some(reason) = self.failures.lock().pop_front() {
                return Err(ClientError::ConnectionError(reason));
            }

            let (outgoing, sent) = mpsc::unbounded_channel();
            let (events, incoming) = mpsc::unbounded_channel();
            let _ = self.peers.send(FakePeer {
                endpoint: endpoint.clone(),
                sent,
                events,
            });
            Ok(Transport { outgoing, incoming })
        }
    }

    impl Dialer for FakeDialer {
        fn is_available(&self) -> bool {
            self.available
        }

        fn dial(
            &self,
            endpoint: &ServerEndpoint,
        ) -> impl Future<Output = Result<Transport, ClientError>> + Send {
            let result = self.connect(endpoint);
            async move { result }
        }
    }

    #[tokio::test]
    async fn test_websocket_dial_failure_is_connection_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let dialer = WebSocketDialer::new("/abc");
        let result = dialer.dial(&ServerEndpoint::new("127.0.0.1", port)).await;
        assert!(matches!(result, Err(ClientError::ConnectionError(_))));
    }

    #[test]
    fn test_websocket_dialer_is_available() {
        assert!(WebSocketDialer::new("/abc").is_available());
    }
}
