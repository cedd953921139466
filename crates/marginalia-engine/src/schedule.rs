/*!
Single-slot cancellable timers for debounced work.

The reading view defers two things: layout recomputation (so a repaint
can land before markers are measured) and note autosave. Both follow
"last write wins" debouncing: re-arming replaces the previous deadline.
The host loop owns time and polls [`Debouncer::fire_ready`].
*/

use std::time::{Duration, Instant};

/// Debounce delay for annotation column layout after a content or span
/// change.
pub const LAYOUT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Debounce delay for persisting free-text notes.
pub const NOTE_SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// A one-shot deadline that re-arming pushes forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Arm the timer, replacing any pending deadline.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Drop any pending deadline without firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline, for hosts that sleep until the next event.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True exactly once per armed deadline, when `now` has reached it.
    /// Firing disarms the timer.
    pub fn fire_ready(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(100);

    #[test]
    fn test_unarmed_timer_never_fires() {
        let mut timer = Debouncer::new(DELAY);
        assert!(!timer.is_armed());
        assert!(!timer.fire_ready(Instant::now()));
    }

    #[test]
    fn test_fires_once_after_delay() {
        let mut timer = Debouncer::new(DELAY);
        let t0 = Instant::now();
        timer.arm(t0);

        assert!(!timer.fire_ready(t0 + Duration::from_millis(99)));
        assert!(timer.fire_ready(t0 + Duration::from_millis(100)));
        // Disarmed after firing.
        assert!(!timer.fire_ready(t0 + Duration::from_millis(300)));
    }

    #[test]
    fn test_rearming_resets_the_deadline() {
        let mut timer = Debouncer::new(DELAY);
        let t0 = Instant::now();
        timer.arm(t0);
        timer.arm(t0 + Duration::from_millis(80));

        // The original deadline has passed but the replacement has not.
        assert!(!timer.fire_ready(t0 + Duration::from_millis(120)));
        assert!(timer.fire_ready(t0 + Duration::from_millis(180)));
    }

    #[test]
    fn test_cancel_drops_pending_deadline() {
        let mut timer = Debouncer::new(DELAY);
        let t0 = Instant::now();
        timer.arm(t0);
        timer.cancel();

        assert!(!timer.is_armed());
        assert!(!timer.fire_ready(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn test_deadline_reports_pending_instant() {
        let mut timer = Debouncer::new(DELAY);
        let t0 = Instant::now();
        assert_eq!(timer.deadline(), None);
        timer.arm(t0);
        assert_eq!(timer.deadline(), Some(t0 + DELAY));
    }
}
