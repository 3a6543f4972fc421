use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use crate::world::PersonEntity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeSummary {
    pub survivor_count: u32,
    pub victim_count: u32,
}

impl OutcomeSummary {
    /// Visible people were never rescued: they are the victims.
    pub fn tally(people: &[PersonEntity]) -> Self {
        let victim_count = people.iter().filter(|p| p.visible).count() as u32;
        Self {
            survivor_count: people.len() as u32 - victim_count,
            victim_count,
        }
    }
}

/// Session countdown. Fires its outcome at most once.
pub struct GameClock {
    total_secs: u32,
    started: Instant,
    finalized: AtomicBool,
}

impl GameClock {
    /// Starts counting now.
    pub fn new(total_secs: u32) -> Self {
        Self::started_at(total_secs, Instant::now())
    }

    pub fn started_at(total_secs: u32, started: Instant) -> Self {
        Self {
            total_secs,
            started,
            finalized: AtomicBool::new(false),
        }
    }

    pub fn total(&self) -> Duration {
        Duration::from_secs(u64::from(self.total_secs))
    }

    /// Whole seconds left; negative once the session is over.
    pub fn remaining(&self) -> i64 {
        self.remaining_at(Instant::now())
    }

    pub fn remaining_at(&self, now: Instant) -> i64 {
        let elapsed = now.saturating_duration_since(self.started).as_secs();
        i64::from(self.total_secs) - elapsed as i64
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    pub fn check_and_fire_outcome(&self, people: &[PersonEntity]) -> Option<OutcomeSummary> {
        self.check_and_fire_outcome_at(Instant::now(), people)
    }

    /// Returns the outcome on the first call that sees negative time left;
    /// `None` before that and on every call after.
    pub fn check_and_fire_outcome_at(
        &self,
        now: Instant,
        people: &[PersonEntity],
    ) -> Option<OutcomeSummary> {
        if self.remaining_at(now) >= 0 {
            return None;
        }
        self.finalized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(OutcomeSummary::tally(people))
    }
}
