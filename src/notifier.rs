//! Best-effort settlement reports to the backing counterparty
//!
//! Reports are sent after the balance is committed and never affect the round:
//! failures are logged and dropped.

use crate::config::NotifierConfig;
use crate::errors::NotifierError;
use crate::games::types::{Outcome, SettlementResult, UserId};
use crate::host::{HostCapabilities, RelayChannel};
use crate::metrics::RoundMetrics;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Wire form of a settled round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementReport {
    /// `null` when the player identifier is not an integer
    pub user_id: Option<i64>,
    pub action: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub bet_amount: Decimal,
    pub game_result: Outcome,
    #[serde(with = "rust_decimal::serde::float")]
    pub coefficient: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub payout: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub new_balance: Decimal,
    pub round_id: String,
}

impl SettlementReport {
    pub fn new(user_id: &UserId, action: &str, result: &SettlementResult) -> Self {
        Self {
            user_id: user_id.as_integer(),
            action: action.to_string(),
            bet_amount: result.wager_amount,
            game_result: result.outcome,
            coefficient: result.coefficient,
            payout: result.payout,
            new_balance: result.new_balance,
            round_id: result.round_id.clone(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn report(&self, report: &SettlementReport) -> Result<(), NotifierError>;
}

/// Sends reports as JSON over the host relay channel
pub struct RelayNotifier {
    relay: Arc<dyn RelayChannel>,
}

impl RelayNotifier {
    pub fn new(relay: Arc<dyn RelayChannel>) -> Self {
        Self { relay }
    }
}

#[async_trait]
impl Notifier for RelayNotifier {
    async fn report(&self, report: &SettlementReport) -> Result<(), NotifierError> {
        let payload =
            serde_json::to_string(report).map_err(|e| NotifierError::EncodeFailed(e.to_string()))?;
        self.relay
            .send_data(&payload)
            .map_err(|e| NotifierError::Unreachable(e.to_string()))
    }
}

/// Used when the host has no relay: the payload is only logged
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn report(&self, report: &SettlementReport) -> Result<(), NotifierError> {
        let payload =
            serde_json::to_string(report).map_err(|e| NotifierError::EncodeFailed(e.to_string()))?;
        tracing::info!(%payload, "Settlement report (no relay channel)");
        Ok(())
    }
}

/// Pick the notifier for the host, or none when reporting is disabled
pub fn notifier_for(host: &HostCapabilities, config: &NotifierConfig) -> Option<Arc<dyn Notifier>> {
    if !config.enabled {
        return None;
    }

    Some(match &host.relay {
        Some(relay) => Arc::new(RelayNotifier::new(relay.clone())),
        None => Arc::new(LogNotifier),
    })
}

/// Fire-and-forget delivery; errors are logged and counted, never returned
pub(crate) fn dispatch(
    notifier: Arc<dyn Notifier>,
    report: SettlementReport,
    metrics: Arc<RoundMetrics>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier.report(&report).await {
            metrics.record_notifier_failure();
            tracing::warn!(round_id = %report.round_id, error = %e, "Settlement report not delivered");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ChannelRelay;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn result() -> SettlementResult {
        SettlementResult {
            round_id: "round-1".to_string(),
            wager_amount: dec!(20),
            outcome: Outcome::Win,
            coefficient: dec!(1.8),
            payout: dec!(36),
            new_balance: dec!(116),
            settled_at: Utc::now(),
        }
    }

    #[test]
    fn test_report_wire_format() {
        let report = SettlementReport::new(&UserId::from(777), "place_bet", &result());
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();

        assert_eq!(json["user_id"], 777);
        assert_eq!(json["action"], "place_bet");
        assert_eq!(json["bet_amount"], 20.0);
        assert_eq!(json["game_result"], "win");
        assert_eq!(json["coefficient"], 1.8);
    }

    #[test]
    fn test_non_integer_user_id_is_null() {
        let report = SettlementReport::new(&UserId::from("u1"), "place_bet", &result());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["user_id"].is_null());
    }

    #[tokio::test]
    async fn test_relay_notifier_sends_json() {
        let (relay, mut rx) = ChannelRelay::new();
        let notifier = RelayNotifier::new(Arc::new(relay));
        let report = SettlementReport::new(&UserId::from(1), "place_bet", &result());

        notifier.report(&report).await.unwrap();

        let sent: SettlementReport = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(sent, report);
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let (relay, rx) = ChannelRelay::new();
        drop(rx);
        let metrics = Arc::new(RoundMetrics::new());
        let report = SettlementReport::new(&UserId::from(1), "place_bet", &result());

        dispatch(Arc::new(RelayNotifier::new(Arc::new(relay))), report, metrics.clone())
            .await
            .unwrap();

        assert_eq!(metrics.snapshot().notifier_failures, 1);
    }

    #[test]
    fn test_disabled_notifier() {
        let config = NotifierConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(notifier_for(&HostCapabilities::none(), &config).is_none());
    }
}
