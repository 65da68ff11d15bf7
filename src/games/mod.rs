pub mod balance;
pub mod display;
pub mod guard;
pub mod pending;
pub mod resolver;
pub mod settlement;
pub mod types;

pub use balance::BalanceStore;
pub use display::{GameDisplay, ResultView, ShotPhase};
pub use guard::SessionGuard;
pub use pending::PendingRounds;
pub use resolver::{OutcomeResolver, OutcomeSource, ResolutionStrategy};
pub use settlement::{PlayerSession, SettlementEngine};
pub use types::*;
