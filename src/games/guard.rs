//! Single-flight gate for settlement rounds
//!
//! At most one round per client may be in progress. Rejected attempts are dropped,
//! never queued. The play affordance is published on a watch channel so a front end
//! can disable its play control while a round runs.

use crate::games::types::RoundState;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

pub struct SessionGuard {
    in_progress: AtomicBool,
    play_enabled: watch::Sender<bool>,
}

impl SessionGuard {
    pub fn new() -> Self {
        let (play_enabled, _) = watch::channel(true);
        Self {
            in_progress: AtomicBool::new(false),
            play_enabled,
        }
    }

    /// Admit a new round. Returns false, without side effects, if one is already running.
    pub fn try_begin_round(&self) -> bool {
        let admitted = self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if admitted {
            self.play_enabled.send_replace(false);
        }
        admitted
    }

    /// Return to `Idle` unconditionally and re-enable play.
    pub fn end_round(&self) {
        self.in_progress.store(false, Ordering::Release);
        self.play_enabled.send_replace(true);
    }

    /// Scoped form of [`try_begin_round`](Self::try_begin_round); the round ends when the permit drops.
    pub fn acquire(&self) -> Option<RoundPermit<'_>> {
        if self.try_begin_round() {
            Some(RoundPermit { guard: self })
        } else {
            None
        }
    }

    pub fn state(&self) -> RoundState {
        if self.in_progress.load(Ordering::Acquire) {
            RoundState::InProgress
        } else {
            RoundState::Idle
        }
    }

    /// Watch the play affordance (`true` = play control enabled)
    pub fn subscribe_play_enabled(&self) -> watch::Receiver<bool> {
        self.play_enabled.subscribe()
    }
}

impl Default for SessionGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the session guard on drop, on success and failure paths alike
pub struct RoundPermit<'a> {
    guard: &'a SessionGuard,
}

impl Drop for RoundPermit<'_> {
    fn drop(&mut self) {
        self.guard.end_round();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_is_rejected() {
        let guard = SessionGuard::new();
        assert!(guard.try_begin_round());
        assert_eq!(guard.state(), RoundState::InProgress);

        assert!(!guard.try_begin_round());
        assert_eq!(guard.state(), RoundState::InProgress);

        guard.end_round();
        assert_eq!(guard.state(), RoundState::Idle);
        assert!(guard.try_begin_round());
    }

    #[test]
    fn test_end_round_is_unconditional() {
        let guard = SessionGuard::new();
        guard.end_round();
        assert_eq!(guard.state(), RoundState::Idle);
    }

    #[test]
    fn test_permit_releases_on_drop() {
        let guard = SessionGuard::new();
        let play = guard.subscribe_play_enabled();

        {
            let permit = guard.acquire();
            assert!(permit.is_some());
            assert!(!*play.borrow());
            assert!(guard.acquire().is_none());
        }

        assert_eq!(guard.state(), RoundState::Idle);
        assert!(*play.borrow());
    }

    #[test]
    fn test_rejected_attempt_leaves_affordance_alone() {
        let guard = SessionGuard::new();
        let play = guard.subscribe_play_enabled();

        let _permit = guard.acquire().unwrap();
        assert!(!guard.try_begin_round());
        assert!(!*play.borrow());
    }
}
