// src/persistence/autosave.rs

use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(750);
pub const DEFAULT_MAX_LATENCY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosavePolicy {
    /// Quiet period after the last change before a save fires.
    pub debounce: Duration,
    /// Upper bound on how long a change may stay unsaved during continuous editing.
    pub max_latency: Duration,
}

impl Default for AutosavePolicy {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            max_latency: DEFAULT_MAX_LATENCY,
        }
    }
}

/// Debounced save scheduling with a latency ceiling. Holds no clock; callers pass `now`.
#[derive(Debug, Clone)]
pub struct Autosaver {
    policy: AutosavePolicy,
    first_unsaved_at: Option<Instant>,
    last_change_at: Option<Instant>,
    pending_revision: Option<u64>,
    saved_revision: u64,
    stopped: bool,
}

impl Autosaver {
    pub fn new(policy: AutosavePolicy, saved_revision: u64) -> Self {
        Self {
            policy,
            first_unsaved_at: None,
            last_change_at: None,
            pending_revision: None,
            saved_revision,
            stopped: false,
        }
    }

    pub fn policy(&self) -> AutosavePolicy {
        self.policy
    }

    pub fn note_change(&mut self, revision: u64, now: Instant) {
        if self.stopped || revision <= self.saved_revision {
            return;
        }
        self.first_unsaved_at.get_or_insert(now);
        self.last_change_at = Some(now);
        self.pending_revision = Some(revision);
    }

    pub fn is_due(&self, now: Instant) -> bool {
        if self.stopped {
            return false;
        }
        match self.deadline() {
            Some(at) => now >= at,
            None => false,
        }
    }

    /// Earliest instant a save becomes due, if anything is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending_revision?;
        let quiet = self.last_change_at? + self.policy.debounce;
        let ceiling = self.first_unsaved_at? + self.policy.max_latency;
        Some(quiet.min(ceiling))
    }

    pub fn mark_saved(&mut self, revision: u64) {
        self.saved_revision = self.saved_revision.max(revision);
        if self
            .pending_revision
            .is_some_and(|p| p <= self.saved_revision)
        {
            self.pending_revision = None;
            self.first_unsaved_at = None;
            self.last_change_at = None;
        }
    }

    /// A due save failed: keep the change pending and restart both clocks from `now`.
    pub fn retry_later(&mut self, now: Instant) {
        if self.pending_revision.is_some() {
            self.first_unsaved_at = Some(now);
            self.last_change_at = Some(now);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.pending_revision.is_some()
    }

    pub fn pending_revision(&self) -> Option<u64> {
        self.pending_revision
    }

    pub fn saved_revision(&self) -> u64 {
        self.saved_revision
    }

    /// No further saves become due after this.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

// ======================================================
// Unit Tests
// ======================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn debounce_fires_after_quiet_period() {
        let t0 = Instant::now();
        let mut a = Autosaver::new(AutosavePolicy::default(), 0);
        assert!(!a.is_dirty());
        assert!(!a.is_due(t0));

        a.note_change(1, t0);
        assert!(a.is_dirty());
        assert!(!a.is_due(t0 + ms(749)));
        assert!(a.is_due(t0 + ms(750)));

        a.mark_saved(1);
        assert!(!a.is_dirty());
        assert!(!a.is_due(t0 + ms(5_000)));
    }

    #[test]
    fn continuous_typing_is_capped_by_max_latency() {
        let policy = AutosavePolicy {
            debounce: ms(750),
            max_latency: ms(3_000),
        };
        let t0 = Instant::now();
        let mut a = Autosaver::new(policy, 0);

        // a keystroke every 500ms never lets the debounce settle
        for i in 0..6u64 {
            let now = t0 + ms(500 * i);
            a.note_change(i + 1, now);
            assert!(!a.is_due(now), "due too early at step {i}");
        }
        assert!(a.is_due(t0 + ms(3_000)));
        assert_eq!(a.deadline(), Some(t0 + ms(3_000)));
    }

    #[test]
    fn saving_an_older_revision_keeps_newer_change_pending() {
        let t0 = Instant::now();
        let mut a = Autosaver::new(AutosavePolicy::default(), 0);
        a.note_change(1, t0);
        a.note_change(2, t0 + ms(100));

        a.mark_saved(1);
        assert!(a.is_dirty());
        assert_eq!(a.pending_revision(), Some(2));

        a.mark_saved(2);
        assert!(!a.is_dirty());
        assert_eq!(a.saved_revision(), 2);
    }

    #[test]
    fn retry_later_pushes_the_deadline_out() {
        let t0 = Instant::now();
        let mut a = Autosaver::new(AutosavePolicy::default(), 0);
        a.note_change(1, t0);
        let t1 = t0 + ms(800);
        assert!(a.is_due(t1));

        a.retry_later(t1);
        assert!(a.is_dirty());
        assert!(!a.is_due(t1 + ms(100)));
        assert!(a.is_due(t1 + ms(750)));
    }

    #[test]
    fn changes_at_or_below_saved_revision_are_ignored() {
        let t0 = Instant::now();
        let mut a = Autosaver::new(AutosavePolicy::default(), 4);
        a.note_change(4, t0);
        assert!(!a.is_dirty());
    }

    #[test]
    fn stopped_autosaver_never_fires() {
        let t0 = Instant::now();
        let mut a = Autosaver::new(AutosavePolicy::default(), 0);
        a.note_change(1, t0);
        a.stop();
        assert!(a.is_dirty());
        assert!(!a.is_due(t0 + ms(60_000)));
        a.note_change(2, t0);
        assert_eq!(a.pending_revision(), Some(1));
    }
}
