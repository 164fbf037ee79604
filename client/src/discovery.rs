//! Game server discovery through the directory service.
//!
//! The directory answers `{"Status": ..., "Hostport": ...}`. Until it says
//! `OK` the client keeps asking on a fixed delay. Every request carries an
//! attempt id and only the newest attempt's answer is acted on, so a slow
//! response can never race a retry that was already issued.

use crate::error::ClientError;
use log::{debug, info};
use shared::{DirectoryReply, ServerEndpoint};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

/// Source of raw directory replies.
pub trait Directory: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<String, ClientError>> + Send;
}

/// Directory reached over HTTP with a blocking `ureq` agent.
///
/// Requests run on tokio's blocking pool. The agent's own timeout bounds
/// each call, since aborting the awaiting task cannot stop the thread.
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    url: String,
    agent: ureq::Agent,
}

impl HttpDirectory {
    /// Accepts `http://host:port/path`, `host:port/path` or `host:port`.
    pub fn new(addr: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        let invalid = || ClientError::InvalidEndpoint(addr.to_string());

        let rest = addr.strip_prefix("http://").unwrap_or(addr);
        let (authority, path) = match rest.find('/') {
            Some(index) => (&rest[..index], &rest[index..]),
            None => (rest, "/"),
        };

        let host = match authority.rsplit_once(':') {
            Some((host, port)) => {
                port.parse::<u16>().map_err(|_| invalid())?;
                host
            }
            None => authority,
        };
        if host.is_empty() {
            return Err(invalid());
        }

        let agent = ureq::AgentBuilder::new().timeout(request_timeout).build();

        Ok(Self {
            url: format!("http://{}{}", authority, path),
            agent,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn get(agent: &ureq::Agent, url: &str) -> Result<String, ClientError> {
    let response = agent
        .get(url)
        .set("Accept", "application/json")
        .call()
        .map_err(|e| ClientError::DirectoryUnreachable(e.to_string()))?;

    response
        .into_string()
        .map_err(|e| ClientError::DirectoryUnreachable(format!("failed to read reply: {}", e)))
}

impl Directory for HttpDirectory {
    fn fetch(&self) -> impl Future<Output = Result<String, ClientError>> + Send {
        let agent = self.agent.clone();
        let url = self.url.clone();

        async move {
            tokio::task::spawn_blocking(move || get(&agent, &url))
                .await
                .map_err(|e| ClientError::DirectoryUnreachable(e.to_string()))?
        }
    }
}

/// Turns a directory body into the endpoint it assigns.
pub fn decode_reply(body: &str) -> Result<ServerEndpoint, ClientError> {
    let reply: DirectoryReply = serde_json::from_str(body)
        .map_err(|e| ClientError::DiscoveryMalformed(e.to_string()))?;

    if !reply.is_ready() {
        return Err(ClientError::DiscoveryUnready(reply.status));
    }

    reply
        .hostport
        .parse()
        .map_err(|e: shared::ProtocolError| ClientError::DiscoveryMalformed(e.to_string()))
}

/// Messages the discovery tasks post back to the owning event loop.
#[derive(Debug)]
pub enum DiscoveryMessage {
    Response {
        attempt: u64,
        body: Result<String, ClientError>,
    },
    RetryDue {
        attempt: u64,
    },
}

/// Retry loop against the directory.
///
/// Requests and retry timers run as tasks that report back through `tx`;
/// the owner feeds those messages to [`DiscoveryClient::handle`].
pub struct DiscoveryClient<D, M> {
    directory: Arc<D>,
    retry_delay: Duration,
    request_timeout: Duration,
    attempt: u64,
    active: bool,
    in_flight: Option<JoinHandle<()>>,
    retry_timer: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<M>,
}

impl<D, M> DiscoveryClient<D, M>
where
    D: Directory,
    M: From<DiscoveryMessage> + Send + 'static,
{
    pub fn new(
        directory: Arc<D>,
        retry_delay: Duration,
        request_timeout: Duration,
        tx: mpsc::UnboundedSender<M>,
    ) -> Self {
        Self {
            directory,
            retry_delay,
            request_timeout,
            attempt: 0,
            active: false,
            in_flight: None,
            retry_timer: None,
            tx,
        }
    }

    /// Starts a discovery cycle, superseding any cycle already running.
    pub fn discover(&mut self) {
        self.abort_tasks();
        self.active = true;
        self.issue_request();
    }

    /// Applies one message. Returns the endpoint once the directory is ready.
    pub fn handle(&mut self, message: DiscoveryMessage) -> Option<ServerEndpoint> {
        match message {
            DiscoveryMessage::Response { attempt, body } => {
                if !self.is_current(attempt) {
                    debug!("Discarding directory reply for stale attempt {}", attempt);
                    return None;
                }
                self.in_flight = None;

                match body.and_then(|body| decode_reply(&body)) {
                    Ok(endpoint) => {
                        info!("Directory assigned game server {}", endpoint);
                        self.cancel();
                        Some(endpoint)
                    }
                    Err(e) => {
                        info!("Directory not ready ({}), retrying in {:?}", e, self.retry_delay);
                        self.schedule_retry();
                        None
                    }
                }
            }
            DiscoveryMessage::RetryDue { attempt } => {
                if !self.is_current(attempt) {
                    debug!("Ignoring retry timer for stale attempt {}", attempt);
                    return None;
                }
                self.retry_timer = None;
                self.issue_request();
                None
            }
        }
    }

    /// Stops the cycle and cancels the pending request and retry timer.
    pub fn cancel(&mut self) {
        self.active = false;
        self.abort_tasks();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_retry_pending(&self) -> bool {
        self.retry_timer.is_some()
    }

    /// Id of the most recent attempt.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    fn is_current(&self, attempt: u64) -> bool {
        self.active && attempt == self.attempt
    }

    fn issue_request(&mut self) {
        self.attempt += 1;
        let attempt = self.attempt;
        let directory = Arc::clone(&self.directory);
        let request_timeout = self.request_timeout;
        let tx = self.tx.clone();

        debug!("Directory request attempt {}", attempt);
        self.in_flight = Some(tokio::spawn(async move {
            let body = match timeout(request_timeout, directory.fetch()).await {
                Ok(result) => result,
                Err(_) => Err(ClientError::DirectoryUnreachable(format!(
                    "no reply within {:?}",
                    request_timeout
                ))),
            };
            let _ = tx.send(DiscoveryMessage::Response { attempt, body }.into());
        }));
    }

    fn schedule_retry(&mut self) {
        if let Some(timer) = self.retry_timer.take() {
            timer.abort();
        }

        let attempt = self.attempt;
        let delay = self.retry_delay;
        let tx = self.tx.clone();

        self.retry_timer = Some(tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(DiscoveryMessage::RetryDue { attempt }.into());
        }));
    }

    fn abort_tasks(&mut self) {
        if let Some(request) = self.in_flight.take() {
            request.abort();
        }
        if let Some(timer) = self.retry_timer.take() {
            timer.abort();
        }
    }
}

impl<D, M> Drop for DiscoveryClient<D, M> {
    fn drop(&mut self) {
        if let Some(request) = self.in_flight.take() {
            request.abort();
        }
        if let Some(timer) = self.retry_timer.take() {
            timer.abort();
        }
    }
}
