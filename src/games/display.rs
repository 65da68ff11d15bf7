//! Observable presentation state for a front end
//!
//! Nothing here feeds back into settlement; it only mirrors what the resolver and
//! the settlement engine have already decided.

use crate::games::balance::format_amount;
use crate::games::types::{InboundMessage, Outcome};
use rust_decimal::Decimal;
use tokio::sync::watch;

/// What the shot animation is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotPhase {
    Idle,
    Throwing,
    Scored,
    Missed,
}

impl ShotPhase {
    pub fn terminal(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Win => ShotPhase::Scored,
            Outcome::Lose => ShotPhase::Missed,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ShotPhase::Idle => "",
            ShotPhase::Throwing => "Throwing...",
            ShotPhase::Scored => "Scored!",
            ShotPhase::Missed => "Missed...",
        }
    }
}

/// Result panel with its three visual states (plus the initial blank one)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultView {
    Idle,
    Waiting,
    Win { payout: Decimal, currency: String },
    Lose { stake: Decimal, currency: String },
}

impl ResultView {
    pub fn message(&self) -> String {
        match self {
            ResultView::Idle => String::new(),
            ResultView::Waiting => "Game started...".to_string(),
            ResultView::Win { payout, currency } => {
                format!("You won! +{} {}", format_amount(*payout), currency)
            }
            ResultView::Lose { stake, currency } => {
                format!("You lost {} {}", format_amount(*stake), currency)
            }
        }
    }
}

pub struct GameDisplay {
    shot: watch::Sender<ShotPhase>,
    result: watch::Sender<ResultView>,
    balance: watch::Sender<String>,
}

impl GameDisplay {
    pub fn new() -> Self {
        Self {
            shot: watch::channel(ShotPhase::Idle).0,
            result: watch::channel(ResultView::Idle).0,
            balance: watch::channel(format_amount(Decimal::ZERO)).0,
        }
    }

    pub fn set_shot(&self, phase: ShotPhase) {
        self.shot.send_replace(phase);
    }

    pub fn set_result(&self, view: ResultView) {
        self.result.send_replace(view);
    }

    pub fn set_balance(&self, balance: Decimal) {
        self.balance.send_replace(format_amount(balance));
    }

    /// Show a result relayed by the counterparty. Display only: never settles a round.
    pub fn show_inbound(&self, message: &InboundMessage) {
        tracing::debug!(outcome = %message.game_result, "Inbound game result displayed");
        self.set_shot(ShotPhase::terminal(message.game_result));
    }

    pub fn shot(&self) -> ShotPhase {
        *self.shot.borrow()
    }

    pub fn result(&self) -> ResultView {
        self.result.borrow().clone()
    }

    pub fn balance_text(&self) -> String {
        self.balance.borrow().clone()
    }

    pub fn subscribe_shot(&self) -> watch::Receiver<ShotPhase> {
        self.shot.subscribe()
    }

    pub fn subscribe_result(&self) -> watch::Receiver<ResultView> {
        self.result.subscribe()
    }

    pub fn subscribe_balance(&self) -> watch::Receiver<String> {
        self.balance.subscribe()
    }
}

impl Default for GameDisplay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_result_messages() {
        let win = ResultView::Win { payout: dec!(36), currency: "USDT".into() };
        let lose = ResultView::Lose { stake: dec!(20), currency: "USDT".into() };

        assert_eq!(win.message(), "You won! +36.00 USDT");
        assert_eq!(lose.message(), "You lost 20.00 USDT");
        assert_eq!(ResultView::Waiting.message(), "Game started...");
    }

    #[test]
    fn test_inbound_message_only_touches_shot() {
        let display = GameDisplay::new();
        display.set_balance(dec!(100));

        display.show_inbound(&InboundMessage { game_result: Outcome::Win });

        assert_eq!(display.shot(), ShotPhase::Scored);
        assert_eq!(display.result(), ResultView::Idle);
        assert_eq!(display.balance_text(), "100.00");
    }
}
