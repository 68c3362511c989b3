use super::*;

/// Tracks consecutive rejected shares. A run reaching the threshold asks for a resync, since
/// it usually means our extranonce or job state no longer matches the pool's.
#[derive(Debug, Clone)]
pub struct RejectTracker {
    threshold: u32,
    /// Count of consecutive rejects (resets on accepted share or resync)
    consecutive_rejects: u32,
    /// Timestamp of first reject in current consecutive run
    first_reject: Option<Instant>,
}

impl RejectTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive_rejects: 0,
            first_reject: None,
        }
    }

    /// Records a rejected share. Returns true when the run reaches the threshold, after which
    /// tracking starts over so a single burst triggers once.
    pub fn record_reject(&mut self) -> bool {
        self.consecutive_rejects += 1;
        self.first_reject.get_or_insert_with(Instant::now);

        if self.consecutive_rejects < self.threshold {
            return false;
        }

        warn!(
            "{} consecutive rejects over {:.1}s",
            self.consecutive_rejects,
            self.reject_duration().unwrap_or_default().as_secs_f64()
        );

        self.record_accept();

        true
    }

    pub fn record_accept(&mut self) {
        self.consecutive_rejects = 0;
        self.first_reject = None;
    }

    pub fn consecutive_rejects(&self) -> u32 {
        self.consecutive_rejects
    }

    /// Duration since the first reject in the current run, if any.
    pub fn reject_duration(&self) -> Option<Duration> {
        self.first_reject.map(|t| t.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triggers_at_threshold() {
        let mut tracker = RejectTracker::new(3);

        assert!(!tracker.record_reject());
        assert!(!tracker.record_reject());
        assert_eq!(tracker.consecutive_rejects(), 2);
        assert!(tracker.reject_duration().is_some());

        assert!(tracker.record_reject());
        assert_eq!(tracker.consecutive_rejects(), 0);
        assert!(tracker.reject_duration().is_none());
    }

    #[test]
    fn accept_breaks_the_run() {
        let mut tracker = RejectTracker::new(3);

        tracker.record_reject();
        tracker.record_reject();
        tracker.record_accept();

        assert!(!tracker.record_reject());
        assert!(!tracker.record_reject());
        assert!(tracker.record_reject());
    }

    #[test]
    fn retriggers_on_next_burst() {
        let mut tracker = RejectTracker::new(2);

        let triggers = (0..6).filter(|_| tracker.record_reject()).count();

        assert_eq!(triggers, 3);
    }

    #[test]
    fn zero_threshold_means_every_reject() {
        let mut tracker = RejectTracker::new(0);
        assert!(tracker.record_reject());
    }
}
