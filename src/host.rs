//! Seams to the embedding host
//!
//! The host may offer a game surface (launch a game, publish score events) and a
//! relay channel to the backing counterparty. Which of these exist decides the
//! outcome strategy; see [`crate::games::resolver`].

use crate::errors::{HoopshotResult, NotifierError, ResolverError};
use crate::games::display::GameDisplay;
use crate::games::types::{InboundMessage, ScoreReport};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Host-provided game surface
pub trait GameSurface: Send + Sync {
    /// Start the named game with an initial score
    fn launch_game(&self, game_short_name: &str, initial_score: i64) -> HoopshotResult<()>;

    /// Subscribe to score-report events. Subscribe before launching so no report is missed.
    fn subscribe_scores(&self) -> broadcast::Receiver<ScoreReport>;
}

/// Outbound structured-message channel to the backing counterparty
pub trait RelayChannel: Send + Sync {
    /// Send one JSON message. No acknowledgement is awaited.
    fn send_data(&self, payload: &str) -> HoopshotResult<()>;
}

/// Capabilities the host exposes to this client
#[derive(Clone, Default)]
pub struct HostCapabilities {
    pub game_surface: Option<Arc<dyn GameSurface>>,
    pub relay: Option<Arc<dyn RelayChannel>>,
}

impl HostCapabilities {
    /// No host at all: local simulation only
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_game_surface(mut self, surface: Arc<dyn GameSurface>) -> Self {
        self.game_surface = Some(surface);
        self
    }

    pub fn with_relay(mut self, relay: Arc<dyn RelayChannel>) -> Self {
        self.relay = Some(relay);
        self
    }
}

/// In-process game surface driven by [`report_score`](Self::report_score)
pub struct LocalGameSurface {
    scores: broadcast::Sender<ScoreReport>,
    launches: AtomicUsize,
}

impl LocalGameSurface {
    pub fn new() -> Self {
        let (scores, _) = broadcast::channel(16);
        Self {
            scores,
            launches: AtomicUsize::new(0),
        }
    }

    /// Publish a score event; returns how many subscribers saw it
    pub fn report_score(&self, score: f64) -> usize {
        self.scores.send(ScoreReport { score }).unwrap_or(0)
    }

    /// Live score subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.scores.receiver_count()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

impl Default for LocalGameSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl GameSurface for LocalGameSurface {
    fn launch_game(&self, game_short_name: &str, initial_score: i64) -> HoopshotResult<()> {
        if game_short_name.is_empty() {
            return Err(ResolverError::LaunchFailed("empty game name".to_string()).into());
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(game = game_short_name, initial_score, "Game launched on local surface");
        Ok(())
    }

    fn subscribe_scores(&self) -> broadcast::Receiver<ScoreReport> {
        self.scores.subscribe()
    }
}

/// Relay that forwards every message into an unbounded channel
pub struct ChannelRelay {
    outbound: mpsc::UnboundedSender<String>,
}

impl ChannelRelay {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        (Self { outbound }, rx)
    }
}

impl RelayChannel for ChannelRelay {
    fn send_data(&self, payload: &str) -> HoopshotResult<()> {
        self.outbound
            .send(payload.to_string())
            .map_err(|_| NotifierError::Unreachable("relay receiver dropped".to_string()).into())
    }
}

/// Route inbound counterparty messages to the display until the sender side closes.
///
/// Messages without a recognisable `game_result` are ignored.
pub fn spawn_inbound_listener(
    display: Arc<GameDisplay>,
    mut inbound: mpsc::Receiver<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(raw) = inbound.recv().await {
            match serde_json::from_str::<InboundMessage>(&raw) {
                Ok(message) => display.show_inbound(&message),
                Err(e) => tracing::debug!(error = %e, "Ignoring inbound message"),
            }
        }
    })
}
