//! Hoopshot - wagering client for a single-player basketball mini-game
//!
//! A player stakes part of their balance, a shot is resolved as scored or missed,
//! and the stake is settled against a fixed payout coefficient. The interesting
//! part is the settlement round: single-flight per client, validated against the
//! cached balance, resolved exactly once, applied in one durable commit, then
//! reported to the backing counterparty on a best-effort basis.

pub mod client;
pub mod config;
pub mod errors;
pub mod games;
pub mod host;
pub mod metrics;
pub mod notifier;
pub mod storage;

pub use client::{GameClient, GameClientBuilder};
pub use config::{ConfigLoader, HoopshotConfig};
pub use errors::{HoopshotError, HoopshotResult, ValidationError};
pub use games::{
    Account, Outcome, PlayerSession, RoundPhase, RoundState, SettlementEngine, SettlementResult,
    UserId,
};
pub use host::HostCapabilities;
