//! Settlement engine
//!
//! One round runs `Validating -> Resolving -> Settling -> Done`, entered through the
//! engine's session guard, so a client settles at most one round at a time whatever
//! the number of open sessions. The stake is debited and the payout credited in a
//! single commit, which is durable before the counterparty is told. The guard is
//! released on every exit path.

use crate::config::HoopshotConfig;
use crate::errors::{HoopshotError, HoopshotResult, ValidationError};
use crate::games::balance::BalanceStore;
use crate::games::display::{GameDisplay, ResultView};
use crate::games::guard::SessionGuard;
use crate::games::resolver::OutcomeResolver;
use crate::games::types::{
    Account, CoefficientTable, Outcome, RoundPhase, SettlementResult, UserId, Wager,
};
use crate::metrics::RoundMetrics;
use crate::notifier::{self, Notifier, SettlementReport};
use chrono::Utc;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Per-session context: who is playing and where their last round got to
pub struct PlayerSession {
    user_id: UserId,
    phase: watch::Sender<RoundPhase>,
}

impl PlayerSession {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            phase: watch::channel(RoundPhase::Idle).0,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn phase(&self) -> RoundPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<RoundPhase> {
        self.phase.subscribe()
    }

    fn enter(&self, phase: RoundPhase) {
        self.phase.send_replace(phase);
    }
}

/// Balance change for a resolved round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub coefficient: Decimal,
    pub payout: Decimal,
    pub new_balance: Decimal,
}

/// Payout arithmetic: `payout = stake * coefficient`, `new = current - stake + payout`.
///
/// `None` when a result does not fit in a [`Decimal`].
pub fn settle(wager: &Wager, outcome: Outcome, current_balance: Decimal) -> Option<Settlement> {
    let coefficient = wager.coefficients.coefficient(outcome);
    let payout = wager.amount.checked_mul(coefficient)?;
    let new_balance = current_balance
        .checked_sub(wager.amount)?
        .checked_add(payout)?;

    Some(Settlement {
        coefficient,
        payout,
        new_balance,
    })
}

/// Parse the stake field. Empty input is "missing", anything unparsable is "not numeric".
pub fn parse_stake(input: Option<&str>) -> Result<Decimal, ValidationError> {
    let text = input.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(ValidationError::MissingStake);
    }

    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|_| ValidationError::NotNumeric(text.to_string()))
}

pub struct SettlementEngine {
    guard: SessionGuard,
    store: Arc<BalanceStore>,
    resolver: OutcomeResolver,
    notifier: Option<Arc<dyn Notifier>>,
    coefficients: CoefficientTable,
    presets: Vec<Decimal>,
    currency: String,
    action: String,
    display: Arc<GameDisplay>,
    metrics: Arc<RoundMetrics>,
}

impl SettlementEngine {
    pub fn new(
        config: &HoopshotConfig,
        store: Arc<BalanceStore>,
        resolver: OutcomeResolver,
        notifier: Option<Arc<dyn Notifier>>,
        display: Arc<GameDisplay>,
    ) -> Self {
        Self {
            guard: SessionGuard::new(),
            store,
            resolver,
            notifier,
            coefficients: CoefficientTable::new(
                config.game.win_coefficient,
                config.game.lose_coefficient,
            ),
            presets: config.game.preset_amounts.clone(),
            currency: config.game.currency.clone(),
            action: config.notifier.action.clone(),
            display,
            metrics: Arc::new(RoundMetrics::new()),
        }
    }

    /// Single-flight gate shared by every session of this client
    pub fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    pub fn metrics(&self) -> Arc<RoundMetrics> {
        self.metrics.clone()
    }

    pub fn resolver(&self) -> &OutcomeResolver {
        &self.resolver
    }

    pub fn coefficients(&self) -> CoefficientTable {
        self.coefficients
    }

    /// Start a session for `user_id`, reloading its balance from persistence
    pub fn open_session(&self, user_id: UserId) -> (PlayerSession, Account) {
        let account = self.store.load(&user_id);
        self.display.set_balance(account.balance);
        tracing::info!(user_id = %account.user_id, balance = %account.balance, "Session opened");
        (PlayerSession::new(user_id), account)
    }

    pub fn balance(&self, session: &PlayerSession) -> Decimal {
        self.store.get(session.user_id())
    }

    /// Stake for a preset shortcut (zero-based)
    pub fn preset_stake(&self, index: usize) -> Result<Decimal, ValidationError> {
        self.presets
            .get(index)
            .copied()
            .ok_or(ValidationError::UnknownPreset {
                index,
                available: self.presets.len(),
            })
    }

    pub fn presets(&self) -> &[Decimal] {
        &self.presets
    }

    /// Check a stake against the balance and build the wager.
    ///
    /// A wager is only accepted if both outcomes can be settled against `balance`.
    pub fn validate(&self, stake: Decimal, balance: Decimal) -> Result<Wager, ValidationError> {
        if stake <= Decimal::ZERO {
            return Err(ValidationError::NonPositive(stake));
        }
        if stake > balance {
            return Err(ValidationError::InsufficientBalance { stake, balance });
        }

        let wager = Wager {
            amount: stake,
            coefficients: self.coefficients,
        };
        for outcome in [Outcome::Win, Outcome::Lose] {
            if settle(&wager, outcome, balance).is_none() {
                return Err(ValidationError::AmountOutOfRange { stake, balance });
            }
        }
        Ok(wager)
    }

    /// Play one round with the raw stake input.
    ///
    /// Rejections (busy session, invalid stake) leave every piece of state untouched.
    /// A failed resolution or commit leaves the balance at its pre-round value and
    /// sends no report.
    pub async fn play_round(
        &self,
        session: &PlayerSession,
        stake_input: Option<&str>,
    ) -> HoopshotResult<SettlementResult> {
        let user_id = session.user_id();

        // Bad input is turned away without touching the guard
        let stake = match parse_stake(stake_input)
            .and_then(|stake| self.validate(stake, self.store.get(user_id)))
        {
            Ok(wager) => wager.amount,
            Err(e) => return Err(self.reject(user_id, e)),
        };

        let Some(_permit) = self.guard.acquire() else {
            self.metrics.record_rejected();
            tracing::debug!(%user_id, "Round rejected, another is in progress");
            return Err(HoopshotError::RoundBusy);
        };

        session.enter(RoundPhase::Validating);
        let wager = match self.validate(stake, self.store.get(user_id)) {
            Ok(wager) => wager,
            Err(e) => {
                session.enter(RoundPhase::Idle);
                return Err(self.reject(user_id, e));
            }
        };

        let round_id = Uuid::new_v4().to_string();
        self.metrics.record_started();
        tracing::info!(%user_id, %round_id, stake = %wager.amount, "Round started");

        session.enter(RoundPhase::Resolving);
        self.display.set_result(ResultView::Waiting);
        let outcome = match self.resolver.resolve(&round_id).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.abort_round(session, &round_id, e)),
        };

        session.enter(RoundPhase::Settling);
        let current = self.store.get(user_id);
        let settlement = self.validate(wager.amount, current).and_then(|checked| {
            settle(&checked, outcome, current).ok_or(ValidationError::AmountOutOfRange {
                stake: checked.amount,
                balance: current,
            })
        });
        let settlement = match settlement {
            Ok(settlement) => settlement,
            Err(e) => return Err(self.abort_round(session, &round_id, e.into())),
        };
        if let Err(e) = self.store.commit(user_id, settlement.new_balance) {
            return Err(self.abort_round(session, &round_id, e));
        }

        let result = SettlementResult {
            round_id,
            wager_amount: wager.amount,
            outcome,
            coefficient: settlement.coefficient,
            payout: settlement.payout,
            new_balance: settlement.new_balance,
            settled_at: Utc::now(),
        };
        self.publish(&result);
        session.enter(RoundPhase::Done);

        tracing::info!(
            %user_id,
            round_id = %result.round_id,
            %outcome,
            payout = %result.payout,
            balance = %result.new_balance,
            "Round settled"
        );

        if let Some(notifier) = &self.notifier {
            let report = SettlementReport::new(user_id, &self.action, &result);
            notifier::dispatch(notifier.clone(), report, self.metrics.clone());
        }

        Ok(result)
    }

    /// Play one round using a preset shortcut
    pub async fn play_preset(
        &self,
        session: &PlayerSession,
        index: usize,
    ) -> HoopshotResult<SettlementResult> {
        let stake = self.preset_stake(index)?.to_string();
        self.play_round(session, Some(&stake)).await
    }

    fn publish(&self, result: &SettlementResult) {
        self.display.set_balance(result.new_balance);
        self.display.set_result(match result.outcome {
            Outcome::Win => ResultView::Win {
                payout: result.payout,
                currency: self.currency.clone(),
            },
            Outcome::Lose => ResultView::Lose {
                stake: result.wager_amount,
                currency: self.currency.clone(),
            },
        });

        match result.outcome {
            Outcome::Win => self.metrics.record_won(),
            Outcome::Lose => self.metrics.record_lost(),
        }
    }

    fn reject(&self, user_id: &UserId, error: ValidationError) -> HoopshotError {
        self.metrics.record_rejected();
        tracing::debug!(%user_id, error = %error, "Stake rejected");
        error.into()
    }

    fn abort_round(&self, session: &PlayerSession, round_id: &str, error: HoopshotError) -> HoopshotError {
        session.enter(RoundPhase::Idle);
        self.display.set_result(ResultView::Idle);
        self.metrics.record_failed();
        tracing::error!(user_id = %session.user_id(), round_id, error = %error, "Round failed");
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn wager(amount: Decimal) -> Wager {
        Wager {
            amount,
            coefficients: CoefficientTable::default(),
        }
    }

    #[test]
    fn test_settle_win_scenario() {
        let s = settle(&wager(dec!(20)), Outcome::Win, dec!(100)).unwrap();
        assert_eq!(s.payout, dec!(36));
        assert_eq!(s.coefficient, dec!(1.8));
        assert_eq!(s.new_balance, dec!(116));
    }

    #[test]
    fn test_settle_lose_scenario() {
        let s = settle(&wager(dec!(20)), Outcome::Lose, dec!(100)).unwrap();
        assert_eq!(s.payout, dec!(0));
        assert_eq!(s.new_balance, dec!(80));
    }

    #[test]
    fn test_settle_net_change_identities() {
        for (stake, balance) in [(dec!(0.01), dec!(0.01)), (dec!(3.33), dec!(10)), (dec!(999.99), dec!(1000))] {
            let win = settle(&wager(stake), Outcome::Win, balance).unwrap();
            let lose = settle(&wager(stake), Outcome::Lose, balance).unwrap();

            assert_eq!(win.new_balance, balance + stake * dec!(0.8));
            assert_eq!(lose.new_balance, balance - stake);
            assert!(lose.new_balance >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_settle_overflow_is_none() {
        assert!(settle(&wager(dec!(1)), Outcome::Win, Decimal::MAX).is_none());
        assert!(settle(&wager(Decimal::MAX), Outcome::Win, Decimal::MAX).is_none());
        assert_eq!(
            settle(&wager(dec!(1)), Outcome::Lose, Decimal::MAX).map(|s| s.new_balance),
            Some(Decimal::MAX - dec!(1))
        );
    }

    #[test]
    fn test_parse_stake() {
        assert_eq!(parse_stake(None), Err(ValidationError::MissingStake));
        assert_eq!(parse_stake(Some("   ")), Err(ValidationError::MissingStake));
        assert_eq!(parse_stake(Some("abc")), Err(ValidationError::NotNumeric("abc".into())));
        assert_eq!(parse_stake(Some(" 12.50 ")), Ok(dec!(12.5)));
        assert_eq!(parse_stake(Some("2e1")), Ok(dec!(20)));
        assert_eq!(parse_stake(Some("-3")), Ok(dec!(-3)));
    }
}
