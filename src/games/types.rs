use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque player identifier, as handed over by the launching host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Integer form used on the counterparty wire, when the identifier has one
    pub fn as_integer(&self) -> Option<i64> {
        self.0.trim().parse().ok()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self::new(id.to_string())
    }
}

/// Player account as seen by this client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub user_id: UserId,
    pub balance: Decimal,
}

impl Account {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            balance: Decimal::ZERO,
        }
    }
}

/// Round outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Lose,
}

impl Outcome {
    /// Host score reports count as a make only when strictly positive
    pub fn from_score(score: f64) -> Self {
        if score > 0.0 {
            Outcome::Win
        } else {
            Outcome::Lose
        }
    }

    pub fn from_coin(won: bool) -> Self {
        if won {
            Outcome::Win
        } else {
            Outcome::Lose
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Lose => write!(f, "lose"),
        }
    }
}

/// Payout multiplier per outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoefficientTable {
    pub win: Decimal,
    pub lose: Decimal,
}

impl CoefficientTable {
    pub fn new(win: Decimal, lose: Decimal) -> Self {
        Self { win, lose }
    }

    pub fn coefficient(&self, outcome: Outcome) -> Decimal {
        match outcome {
            Outcome::Win => self.win,
            Outcome::Lose => self.lose,
        }
    }
}

impl Default for CoefficientTable {
    fn default() -> Self {
        Self::new(Decimal::new(18, 1), Decimal::ZERO)
    }
}

/// Stake for a single round; only constructed from a validated amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wager {
    pub amount: Decimal,
    pub coefficients: CoefficientTable,
}

impl Wager {
    pub fn payout(&self, outcome: Outcome) -> Decimal {
        self.amount * self.coefficients.coefficient(outcome)
    }
}

/// Record of a completed round, produced once and never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub round_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub wager_amount: Decimal,
    pub outcome: Outcome,
    #[serde(with = "rust_decimal::serde::str")]
    pub coefficient: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub payout: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub new_balance: Decimal,
    pub settled_at: DateTime<Utc>,
}

impl SettlementResult {
    /// Signed balance change applied by this round
    pub fn net_change(&self) -> Decimal {
        self.payout - self.wager_amount
    }
}

/// Session guard state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Idle,
    InProgress,
}

/// Settlement state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    Validating,
    Resolving,
    Settling,
    Done,
}

/// Inbound counterparty message carrying a game result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub game_result: Outcome,
}

/// Score report published by the host game surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_score_mapping() {
        assert_eq!(Outcome::from_score(3.0), Outcome::Win);
        assert_eq!(Outcome::from_score(0.5), Outcome::Win);
        assert_eq!(Outcome::from_score(0.0), Outcome::Lose);
        assert_eq!(Outcome::from_score(-1.0), Outcome::Lose);
    }

    #[test]
    fn test_outcome_wire_format() {
        assert_eq!(serde_json::to_string(&Outcome::Win).unwrap(), "\"win\"");
        let msg: InboundMessage = serde_json::from_str(r#"{"game_result":"lose"}"#).unwrap();
        assert_eq!(msg.game_result, Outcome::Lose);
    }

    #[test]
    fn test_default_coefficients() {
        let table = CoefficientTable::default();
        assert_eq!(table.coefficient(Outcome::Win), dec!(1.8));
        assert_eq!(table.coefficient(Outcome::Lose), dec!(0));

        let wager = Wager { amount: dec!(20), coefficients: table };
        assert_eq!(wager.payout(Outcome::Win), dec!(36.0));
        assert_eq!(wager.payout(Outcome::Lose), dec!(0));
    }

    #[test]
    fn test_user_id_integer_form() {
        assert_eq!(UserId::from(12345).as_integer(), Some(12345));
        assert_eq!(UserId::from("u1").as_integer(), None);
    }
}
