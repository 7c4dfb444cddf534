use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Each edit restarts the quiet window; the filter is applied when the
    /// window elapses with no further edits.
    Auto,
    /// Edits accumulate until an explicit commit.
    Manual,
}

/// Debounced apply scheduler for filter edits.
///
/// There is no timer thread: the pending state is a deadline that the host
/// event loop polls each tick, so dropping the owner can never fire a
/// callback against a torn-down instance. All methods take the current
/// instant so tests can drive the clock.
#[derive(Debug)]
pub struct ApplyScheduler {
    mode: ApplyMode,
    delay: Duration,
    deadline: Option<Instant>,
    dirty: bool,
}

impl ApplyScheduler {
    pub fn new(delay: Duration, mode: ApplyMode) -> Self {
        Self {
            mode,
            delay,
            deadline: None,
            dirty: false,
        }
    }

    pub fn mode(&self) -> ApplyMode {
        self.mode
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Switches modes. Entering Manual cancels the pending window; the
    /// accumulated edits stay dirty until committed. Entering Auto with
    /// dirty edits starts a fresh window.
    pub fn set_mode(&mut self, mode: ApplyMode, now: Instant) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        match mode {
            ApplyMode::Manual => self.deadline = None,
            ApplyMode::Auto => {
                if self.dirty {
                    self.deadline = Some(now + self.delay);
                }
            }
        }
    }

    /// Records an edit. In Auto mode this cancels the prior pending window
    /// and restarts it from `now`.
    pub fn note_edit(&mut self, now: Instant) {
        self.dirty = true;
        if self.mode == ApplyMode::Auto {
            self.deadline = Some(now + self.delay);
        }
    }

    /// Returns true exactly once when the quiet window has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.dirty = false;
                true
            }
            _ => false,
        }
    }

    /// Explicit commit: cancels any pending window and reports whether
    /// there was anything to apply.
    pub fn take_commit(&mut self) -> bool {
        self.deadline = None;
        let was_dirty = self.dirty;
        self.dirty = false;
        was_dirty
    }

    /// Cancels the pending window and discards accumulated edits. Used by
    /// filter reset, which bypasses the scheduler entirely.
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.dirty = false;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    fn scheduler(mode: ApplyMode) -> (ApplyScheduler, Instant) {
        (ApplyScheduler::new(DELAY, mode), Instant::now())
    }

    #[test]
    fn test_quiet_window_fires_once() {
        let (mut s, t0) = scheduler(ApplyMode::Auto);
        s.note_edit(t0);
        assert!(!s.poll(t0 + Duration::from_millis(499)));
        assert!(s.poll(t0 + DELAY));
        assert!(!s.poll(t0 + Duration::from_secs(10)), "fires exactly once");
    }

    #[test]
    fn test_new_edit_restarts_the_window() {
        let (mut s, t0) = scheduler(ApplyMode::Auto);
        s.note_edit(t0);
        s.note_edit(t0 + Duration::from_millis(400));
        // The first deadline has passed but was cancelled by the second edit.
        assert!(!s.poll(t0 + Duration::from_millis(600)));
        assert!(s.poll(t0 + Duration::from_millis(900)));
    }

    #[test]
    fn test_manual_mode_never_fires_on_poll() {
        let (mut s, t0) = scheduler(ApplyMode::Manual);
        s.note_edit(t0);
        assert!(!s.poll(t0 + Duration::from_secs(60)));
        assert!(s.is_dirty());
        assert!(s.take_commit());
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_commit_cancels_pending_window() {
        let (mut s, t0) = scheduler(ApplyMode::Auto);
        s.note_edit(t0);
        assert!(s.is_pending());
        assert!(s.take_commit());
        assert!(!s.is_pending());
        assert!(!s.poll(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn test_commit_with_no_edits_reports_nothing_to_apply() {
        let (mut s, _) = scheduler(ApplyMode::Manual);
        assert!(!s.take_commit());
    }

    #[test]
    fn test_switching_to_manual_cancels_window_but_keeps_dirty() {
        let (mut s, t0) = scheduler(ApplyMode::Auto);
        s.note_edit(t0);
        s.set_mode(ApplyMode::Manual, t0);
        assert!(!s.is_pending());
        assert!(s.is_dirty());
        // Back to auto: dirty edits get a fresh window.
        s.set_mode(ApplyMode::Auto, t0 + Duration::from_secs(1));
        assert!(s.poll(t0 + Duration::from_secs(1) + DELAY));
    }

    #[test]
    fn test_cancel_discards_everything() {
        let (mut s, t0) = scheduler(ApplyMode::Auto);
        s.note_edit(t0);
        s.cancel();
        assert!(!s.is_pending());
        assert!(!s.is_dirty());
        assert!(!s.poll(t0 + Duration::from_secs(1)));
    }
}
