//! Session inactivity timer.
//!
//! The receiver keeps at most one session alive.  If its sender vanishes
//! mid-transfer, [`InactivityTimer`] is what eventually frees the slot: it is
//! re-armed on every accepted fragment and, once `period` passes without
//! activity, reports the session as expired.
//!
//! The timer stores only a deadline.  The server loop races
//! [`InactivityTimer::expired`] against the next inbound datagram, so
//! whichever happens first wins and a late fragment simply pushes the
//! deadline out again.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};

#[derive(Debug, Clone)]
pub struct InactivityTimer {
    period: Duration,
    deadline: Option<Instant>,
}

impl InactivityTimer {
    /// A disarmed timer with the given inactivity period.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            deadline: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Arm (or re-arm) so the timer fires `period` after `now`.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.period);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `true` when armed and the deadline is at or before `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| d <= now)
    }

    /// Resolve at the deadline; never resolves while disarmed.
    ///
    /// The returned future captures the deadline current at the time of the
    /// call, so re-arming requires calling `expired` again.
    pub fn expired(&self) -> impl Future<Output = ()> + Send + 'static {
        let deadline = self.deadline;
        async move {
            match deadline {
                Some(d) => sleep_until(d).await,
                None => std::future::pending().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_timer_is_disarmed() {
        let t = InactivityTimer::new(Duration::from_secs(120));
        assert!(!t.is_armed());
        assert!(!t.is_expired(Instant::now() + Duration::from_secs(1_000)));
    }

    #[tokio::test]
    async fn expires_exactly_at_period() {
        let mut t = InactivityTimer::new(Duration::from_secs(120));
        let start = Instant::now();
        t.arm(start);
        assert!(!t.is_expired(start + Duration::from_secs(119)));
        assert!(t.is_expired(start + Duration::from_secs(120)));
    }

    #[tokio::test]
    async fn rearming_pushes_deadline_out() {
        let mut t = InactivityTimer::new(Duration::from_secs(10));
        let start = Instant::now();
        t.arm(start);
        t.arm(start + Duration::from_secs(8));
        assert!(!t.is_expired(start + Duration::from_secs(15)));
        assert_eq!(t.deadline(), Some(start + Duration::from_secs(18)));
    }

    #[tokio::test]
    async fn disarm_clears_deadline() {
        let mut t = InactivityTimer::new(Duration::from_secs(10));
        t.arm(Instant::now());
        t.disarm();
        assert_eq!(t.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_future_resolves_after_period() {
        let mut t = InactivityTimer::new(Duration::from_secs(120));
        t.arm(Instant::now());
        let before = Instant::now();
        t.expired().await;
        assert!(Instant::now() - before >= Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn disarmed_future_never_resolves() {
        let t = InactivityTimer::new(Duration::from_secs(1));
        let raced = tokio::time::timeout(Duration::from_secs(3_600), t.expired()).await;
        assert!(raced.is_err());
    }
}
