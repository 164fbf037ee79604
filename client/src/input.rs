//! Move sources for the command-line client.
//!
//! Real keyboard/touch capture lives outside this crate. What is here feeds
//! the runtime either a fixed script or random moves on a ticker, which is
//! how the client is driven in automated runs.

use crate::error::ClientError;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::Direction;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

/// Commands the runtime accepts from whatever drives the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCommand {
    Move(Direction),
    Restart,
    Quit,
}

pub enum MoveSource {
    Scripted(VecDeque<Direction>),
    Random(StdRng),
}

impl MoveSource {
    /// Parses `u`/`r`/`d`/`l` or `0`-`3`; whitespace and commas are skipped.
    pub fn scripted(moves: &str) -> Result<Self, ClientError> {
        let mut script = VecDeque::new();

        for c in moves.chars() {
            let direction = match c.to_ascii_lowercase() {
                'u' | '0' => Direction::Up,
                'r' | '1' => Direction::Right,
                'd' | '2' => Direction::Down,
                'l' | '3' => Direction::Left,
                ' ' | ',' | '\t' | '\n' => continue,
                other => return Err(ClientError::InvalidMoves(format!("unexpected {:?}", other))),
            };
            script.push_back(direction);
        }

        Ok(MoveSource::Scripted(script))
    }

    pub fn random(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        MoveSource::Random(rng)
    }

    /// Next move, or `None` once a script is exhausted.
    pub fn next_move(&mut self) -> Option<Direction> {
        match self {
            MoveSource::Scripted(script) => script.pop_front(),
            MoveSource::Random(rng) => Direction::from_code(rng.gen_range(0..4)),
        }
    }
}

/// Collects moves between ticks and releases only the latest one per tick.
#[derive(Debug, Default)]
pub struct InputManager {
    pending: Vec<Direction>,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&mut self, direction: Direction) {
        self.pending.push(direction);
    }

    pub fn take_latest(&mut self) -> Option<Direction> {
        let latest = self.pending.last().copied();
        self.pending.clear();
        latest
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Producer side of a dispatcher started with [`spawn_dispatcher`].
///
/// Moves may be queued at any time; dropping every queue lets the
/// dispatcher finish.
#[derive(Debug, Clone)]
pub struct MoveQueue {
    tx: mpsc::UnboundedSender<Direction>,
}

impl MoveQueue {
    /// Returns false once the dispatcher has stopped.
    pub fn queue(&self, direction: Direction) -> bool {
        self.tx.send(direction).is_ok()
    }
}

/// Sends at most one move per tick: the latest one queued since the last
/// tick. Once every [`MoveQueue`] is dropped and nothing is pending, the
/// next tick sends `Quit`.
pub fn spawn_dispatcher(
    period: Duration,
    commands: mpsc::Sender<InputCommand>,
) -> (MoveQueue, JoinHandle<()>) {
    let (tx, mut moves) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; give the connection a period to open.
        ticker.tick().await;

        let mut manager = InputManager::new();
        let mut producers_done = false;

        loop {
            tokio::select! {
                biased;

                queued = moves.recv(), if !producers_done => match queued {
                    Some(direction) => manager.queue(direction),
                    None => producers_done = true,
                },

                _ = ticker.tick() => {
                    if let Some(direction) = manager.take_latest() {
                        debug!("Dispatching move {:?}", direction);
                        if commands.send(InputCommand::Move(direction)).await.is_err() {
                            break;
                        }
                    } else if producers_done {
                        info!("No more moves to play");
                        let _ = commands.send(InputCommand::Quit).await;
                        break;
                    }
                },
            }
        }
    });

    (MoveQueue { tx }, handle)
}

/// Plays `source` through a dispatcher ticking every `period`.
///
/// Moves are produced half a period out of phase with the ticks, so each
/// tick normally carries one fresh move.
pub fn spawn_autoplay(
    mut source: MoveSource,
    period: Duration,
    commands: mpsc::Sender<InputCommand>,
) -> JoinHandle<()> {
    let (queue, dispatcher) = spawn_dispatcher(period, commands);

    tokio::spawn(async move {
        let mut pace = interval_at(Instant::now() + period / 2, period);
        pace.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            pace.tick().await;
            let Some(direction) = source.next_move() else {
                break;
            };
            if !queue.queue(direction) {
                break;
            }
        }
    });

    dispatcher
}
