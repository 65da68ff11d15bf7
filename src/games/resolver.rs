//! Outcome resolution
//!
//! The strategy is picked once, when the resolver is built, from what the host offers:
//!
//! 1. a game surface: launch the game and map the first score report (`score > 0` wins);
//! 2. a relay channel only: request a game, then draw from an [`OutcomeSource`];
//! 3. neither: simulate a throw and draw from an [`OutcomeSource`].
//!
//! Every strategy shows `Throwing`, then holds `Scored`/`Missed` for the presentation
//! delay before the outcome is returned. Nothing here times out.

use crate::config::HoopshotConfig;
use crate::config::TimingConfig;
use crate::errors::{HoopshotResult, ResolverError};
use crate::games::display::{GameDisplay, ShotPhase};
use crate::games::pending::PendingRounds;
use crate::games::types::Outcome;
use crate::host::{GameSurface, HostCapabilities, RelayChannel};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Source of the true outcome when the host cannot provide one
pub trait OutcomeSource: Send + Sync {
    fn draw(&self) -> Outcome;
}

/// Fair coin: win and lose with probability 0.5 each
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomOutcomeSource;

impl OutcomeSource for RandomOutcomeSource {
    fn draw(&self) -> Outcome {
        Outcome::from_coin(rand::thread_rng().gen_bool(0.5))
    }
}

/// Always the same outcome
#[derive(Debug, Clone, Copy)]
pub struct FixedOutcomeSource(pub Outcome);

impl OutcomeSource for FixedOutcomeSource {
    fn draw(&self) -> Outcome {
        self.0
    }
}

/// Which strategy a resolver was built with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStrategy {
    ExternalChannel,
    MessageRelay,
    LocalSimulation,
}

enum Strategy {
    ExternalChannel {
        surface: Arc<dyn GameSurface>,
    },
    MessageRelay {
        relay: Arc<dyn RelayChannel>,
        source: Arc<dyn OutcomeSource>,
    },
    LocalSimulation {
        source: Arc<dyn OutcomeSource>,
    },
}

#[derive(Serialize)]
struct GameRequest<'a> {
    action: &'static str,
    game_type: &'a str,
}

/// Clears a round's registry entry and stops its score forwarder, including when
/// the waiting future is dropped before a score arrives
struct AwaitingScore {
    pending: PendingRounds,
    round_id: String,
    forwarder: JoinHandle<()>,
}

impl Drop for AwaitingScore {
    fn drop(&mut self) {
        self.forwarder.abort();
        self.pending.remove_pending(&self.round_id);
    }
}

pub struct OutcomeResolver {
    strategy: Strategy,
    game_short_name: String,
    timing: TimingConfig,
    display: Arc<GameDisplay>,
    pending: PendingRounds,
}

impl OutcomeResolver {
    /// Probe host capabilities, falling back to a fair coin for the true outcome
    pub fn probe(host: &HostCapabilities, config: &HoopshotConfig, display: Arc<GameDisplay>) -> Self {
        Self::probe_with_source(host, config, display, Arc::new(RandomOutcomeSource))
    }

    /// Probe host capabilities with an injected outcome source for the non-host strategies
    pub fn probe_with_source(
        host: &HostCapabilities,
        config: &HoopshotConfig,
        display: Arc<GameDisplay>,
        source: Arc<dyn OutcomeSource>,
    ) -> Self {
        let strategy = match (&host.game_surface, &host.relay) {
            (Some(surface), _) => Strategy::ExternalChannel {
                surface: surface.clone(),
            },
            (None, Some(relay)) => Strategy::MessageRelay {
                relay: relay.clone(),
                source,
            },
            (None, None) => Strategy::LocalSimulation { source },
        };

        let resolver = Self {
            strategy,
            game_short_name: config.game.game_short_name.clone(),
            timing: config.timing.clone(),
            display,
            pending: PendingRounds::new(),
        };
        tracing::info!(strategy = ?resolver.kind(), "Outcome resolver ready");
        resolver
    }

    pub fn kind(&self) -> ResolutionStrategy {
        match self.strategy {
            Strategy::ExternalChannel { .. } => ResolutionStrategy::ExternalChannel,
            Strategy::MessageRelay { .. } => ResolutionStrategy::MessageRelay,
            Strategy::LocalSimulation { .. } => ResolutionStrategy::LocalSimulation,
        }
    }

    /// Rounds currently awaiting a host outcome
    pub fn pending(&self) -> &PendingRounds {
        &self.pending
    }

    /// Produce the outcome for one round. Resolves exactly once; never retried.
    pub async fn resolve(&self, round_id: &str) -> HoopshotResult<Outcome> {
        self.display.set_shot(ShotPhase::Throwing);

        let outcome = match &self.strategy {
            Strategy::ExternalChannel { surface } => {
                self.await_host_score(surface.as_ref(), round_id).await?
            }
            Strategy::MessageRelay { relay, source } => {
                self.request_game(relay.as_ref(), round_id);
                tokio::time::sleep(self.timing.relay_dispatch_delay()).await;
                source.draw()
            }
            Strategy::LocalSimulation { source } => {
                tokio::time::sleep(self.timing.simulation_throw_delay()).await;
                source.draw()
            }
        };

        self.display.set_shot(ShotPhase::terminal(outcome));
        tokio::time::sleep(self.timing.presentation_delay()).await;

        tracing::debug!(round_id, %outcome, "Outcome resolved");
        Ok(outcome)
    }

    async fn await_host_score(&self, surface: &dyn GameSurface, round_id: &str) -> HoopshotResult<Outcome> {
        let receiver = self.pending.register(round_id);
        let mut scores = surface.subscribe_scores();

        if let Err(e) = surface.launch_game(&self.game_short_name, 0) {
            self.pending.remove_pending(round_id);
            return Err(e);
        }

        let pending = self.pending.clone();
        let id = round_id.to_string();
        let forwarder = tokio::spawn(async move {
            loop {
                match scores.recv().await {
                    Ok(report) => {
                        if let Err(e) = pending.complete_round(&id, Outcome::from_score(report.score)) {
                            tracing::debug!(error = %e, "Score report ignored");
                        }
                        break;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(round_id = %id, skipped, "Score events lagged");
                    }
                    Err(RecvError::Closed) => {
                        pending.remove_pending(&id);
                        break;
                    }
                }
            }
        });

        let _awaiting = AwaitingScore {
            pending: self.pending.clone(),
            round_id: round_id.to_string(),
            forwarder,
        };
        receiver.await.map_err(|_| ResolverError::ChannelClosed.into())
    }

    fn request_game(&self, relay: &dyn RelayChannel, round_id: &str) {
        let request = GameRequest {
            action: "request_game",
            game_type: &self.game_short_name,
        };

        let sent = serde_json::to_string(&request)
            .map_err(|e| e.to_string())
            .and_then(|payload| relay.send_data(&payload).map_err(|e| e.to_string()));

        if let Err(e) = sent {
            tracing::warn!(round_id, error = %e, "Game request not delivered, using fallback outcome");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ChannelRelay, LocalGameSurface};
    use std::time::Duration;
    use tokio::time::Instant;

    fn resolver_for(host: &HostCapabilities, outcome: Outcome) -> (OutcomeResolver, Arc<GameDisplay>) {
        let display = Arc::new(GameDisplay::new());
        let resolver = OutcomeResolver::probe_with_source(
            host,
            &HoopshotConfig::default(),
            display.clone(),
            Arc::new(FixedOutcomeSource(outcome)),
        );
        (resolver, display)
    }

    #[test]
    fn test_strategy_precedence() {
        let surface: Arc<dyn GameSurface> = Arc::new(LocalGameSurface::new());
        let (relay, _rx) = ChannelRelay::new();
        let relay: Arc<dyn RelayChannel> = Arc::new(relay);

        let both = HostCapabilities::none()
            .with_game_surface(surface)
            .with_relay(relay.clone());
        let relay_only = HostCapabilities::none().with_relay(relay);

        assert_eq!(resolver_for(&both, Outcome::Win).0.kind(), ResolutionStrategy::ExternalChannel);
        assert_eq!(resolver_for(&relay_only, Outcome::Win).0.kind(), ResolutionStrategy::MessageRelay);
        assert_eq!(
            resolver_for(&HostCapabilities::none(), Outcome::Win).0.kind(),
            ResolutionStrategy::LocalSimulation
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_simulation_timing() {
        let (resolver, display) = resolver_for(&HostCapabilities::none(), Outcome::Lose);
        let started = Instant::now();

        let outcome = resolver.resolve("round-1").await.unwrap();

        assert_eq!(outcome, Outcome::Lose);
        assert_eq!(started.elapsed(), Duration::from_millis(3_500));
        assert_eq!(display.shot(), ShotPhase::Missed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_relay_sends_request_then_falls_back() {
        let (relay, mut outbound) = ChannelRelay::new();
        let host = HostCapabilities::none().with_relay(Arc::new(relay));
        let (resolver, _display) = resolver_for(&host, Outcome::Win);
        let started = Instant::now();

        let outcome = resolver.resolve("round-1").await.unwrap();

        assert_eq!(outcome, Outcome::Win);
        assert_eq!(started.elapsed(), Duration::from_millis(3_000));

        let request: serde_json::Value = serde_json::from_str(&outbound.recv().await.unwrap()).unwrap();
        assert_eq!(request["action"], "request_game");
        assert_eq!(request["game_type"], "basketball");
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_channel_maps_first_score() {
        let surface = Arc::new(LocalGameSurface::new());
        let host = HostCapabilities::none().with_game_surface(surface.clone());
        let (resolver, display) = resolver_for(&host, Outcome::Lose);
        let resolver = Arc::new(resolver);

        let task = {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve("round-1").await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(surface.launch_count(), 1);
        assert_eq!(display.shot(), ShotPhase::Throwing);
        assert!(resolver.pending().is_pending("round-1"));

        let reported_at = Instant::now();
        surface.report_score(1.0);
        surface.report_score(0.0);

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, Outcome::Win);
        assert_eq!(reported_at.elapsed(), Duration::from_millis(2_000));
        assert_eq!(display.shot(), ShotPhase::Scored);
        assert_eq!(resolver.pending().pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_channel_zero_score_loses() {
        let surface = Arc::new(LocalGameSurface::new());
        let host = HostCapabilities::none().with_game_surface(surface.clone());
        let (resolver, _display) = resolver_for(&host, Outcome::Win);
        let resolver = Arc::new(resolver);

        let task = {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve("round-1").await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        surface.report_score(0.0);

        assert_eq!(task.await.unwrap().unwrap(), Outcome::Lose);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_round_is_cleaned_up() {
        let surface = Arc::new(LocalGameSurface::new());
        let host = HostCapabilities::none().with_game_surface(surface.clone());
        let (resolver, _display) = resolver_for(&host, Outcome::Win);
        let resolver = Arc::new(resolver);

        let task = {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve("round-1").await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(resolver.pending().is_pending("round-1"));
        assert_eq!(surface.subscriber_count(), 1);

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        assert_eq!(resolver.pending().pending_count(), 0);
        assert_eq!(surface.subscriber_count(), 0);
    }

    struct RefusingSurface;

    impl GameSurface for RefusingSurface {
        fn launch_game(&self, _name: &str, _initial_score: i64) -> HoopshotResult<()> {
            Err(ResolverError::LaunchFailed("unsupported".into()).into())
        }

        fn subscribe_scores(&self) -> tokio::sync::broadcast::Receiver<crate::games::types::ScoreReport> {
            tokio::sync::broadcast::channel(1).1
        }
    }

    #[tokio::test]
    async fn test_launch_failure_is_reported() {
        let host = HostCapabilities::none().with_game_surface(Arc::new(RefusingSurface));
        let (resolver, _display) = resolver_for(&host, Outcome::Win);

        assert!(resolver.resolve("round-1").await.is_err());
        assert_eq!(resolver.pending().pending_count(), 0);
    }
}
