use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use course_core::model::ParticipantId;
use tokio::task::JoinHandle;

struct ArmedTimer {
    seq: u64,
    fire_at: DateTime<Utc>,
    task: JoinHandle<()>,
}

//
// ─── TIMER REGISTRY ────────────────────────────────────────────────────────────
//

/// At most one pending wake-up per participant.
///
/// Task handles never leave the registry. Arming replaces and aborts any
/// pending timer for the same participant under a single lock, and each
/// entry carries a sequence number so a stale fired task cannot evict a
/// newer timer registered after it.
#[derive(Clone, Default)]
pub struct TimerRegistry {
    timers: Arc<Mutex<HashMap<ParticipantId, ArmedTimer>>>,
    seq: Arc<AtomicU64>,
}

impl TimerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_timers(&self) -> MutexGuard<'_, HashMap<ParticipantId, ArmedTimer>> {
        // The map stays usable even if a holder panicked mid-update.
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arms a timer for the participant, replacing any pending one.
    ///
    /// The payload runs once after `delay` unless the timer is canceled or
    /// replaced first. `fire_at` is the instant the delay aims at, kept for
    /// status reporting only.
    pub fn arm<F, Fut>(&self, id: ParticipantId, fire_at: DateTime<Utc>, delay: Duration, payload: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let registry = self.clone();

        // Hold the lock across spawn so the new task cannot observe the map
        // before its own entry is registered.
        let mut timers = self.lock_timers();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let current = {
                let mut timers = registry.lock_timers();
                match timers.get(&id) {
                    Some(armed) if armed.seq == seq => {
                        timers.remove(&id);
                        true
                    }
                    // Replaced or canceled while sleeping.
                    _ => false,
                }
            };
            if current {
                payload().await;
            }
        });

        if let Some(replaced) = timers.insert(id, ArmedTimer { seq, fire_at, task }) {
            replaced.task.abort();
        }
    }

    /// Cancels the participant's pending timer.
    ///
    /// Returns whether one was pending. Canceling an absent or already
    /// fired timer is a no-op.
    pub fn cancel(&self, id: ParticipantId) -> bool {
        let removed = self.lock_timers().remove(&id);
        match removed {
            Some(armed) => {
                armed.task.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a timer is pending for the participant.
    #[must_use]
    pub fn is_armed(&self, id: ParticipantId) -> bool {
        self.lock_timers().contains_key(&id)
    }

    /// Target instant of the participant's pending timer, if any.
    #[must_use]
    pub fn armed_for(&self, id: ParticipantId) -> Option<DateTime<Utc>> {
        self.lock_timers().get(&id).map(|armed| armed.fire_at)
    }

    /// Number of pending timers across all participants.
    #[must_use]
    pub fn armed_count(&self) -> usize {
        self.lock_timers().len()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn id(n: i64) -> ParticipantId {
        ParticipantId::new(n)
    }

    #[tokio::test(start_paused = true)]
    async fn armed_timer_runs_payload_once() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        registry.arm(
            id(1),
            Utc::now(),
            Duration::from_secs(5),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        assert!(registry.is_armed(id(1)));
        assert_eq!(registry.armed_count(), 1);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!registry.is_armed(id(1)));

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn arming_again_replaces_the_pending_timer() {
        let registry = TimerRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first);
        registry.arm(
            id(1),
            Utc::now(),
            Duration::from_secs(5),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        let counter = Arc::clone(&second);
        registry.arm(
            id(1),
            Utc::now(),
            Duration::from_secs(30),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        assert_eq!(registry.armed_count(), 1);

        // Past the first deadline: the replaced timer must not fire.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent_and_stops_the_payload() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        registry.arm(
            id(1),
            Utc::now(),
            Duration::from_secs(5),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        assert!(registry.cancel(id(1)));
        assert!(!registry.cancel(id(1)));
        assert_eq!(registry.armed_count(), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timers_for_distinct_participants_coexist() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for (n, delay) in [(1, 5), (2, 7)] {
            let counter = Arc::clone(&fired);
            registry.arm(
                id(n),
                Utc::now(),
                Duration::from_secs(delay),
                move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
            );
        }
        assert_eq!(registry.armed_count(), 2);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!registry.is_armed(id(1)));
        assert!(registry.is_armed(id(2)));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(registry.armed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn armed_for_reports_the_target_instant() {
        let registry = TimerRegistry::new();
        let target = Utc::now() + chrono::Duration::hours(1);

        registry.arm(id(1), target, Duration::from_secs(5), || async {});
        assert_eq!(registry.armed_for(id(1)), Some(target));
        assert_eq!(registry.armed_for(id(2)), None);
    }
}
