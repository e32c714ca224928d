//! Tokio-backed wake scheduling

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::clock::Clock;

/// Arms the next wake of the loop
pub trait Scheduler: Send + Sync {
    /// Replace any pending wake with one that fires no earlier than
    /// `now + delay`
    fn request_wake(&self, delay: Duration);

    /// Deadline of the pending wake (Unix ms), if one is armed
    fn next_wake_deadline(&self) -> Option<u64>;
}

/// Delivered on the wake channel when a scheduled wake fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeToken {
    pub generation: u64,
}

#[derive(Debug)]
struct PendingWake {
    generation: u64,
    deadline_ms: u64,
    handle: JoinHandle<()>,
}

/// Scheduler that sleeps on a spawned tokio task per armed wake.
///
/// Must be used from inside a tokio runtime.
pub struct TokioScheduler {
    clock: Arc<dyn Clock>,
    wake_tx: mpsc::UnboundedSender<WakeToken>,
    pending: Mutex<Option<PendingWake>>,
    generation: AtomicU64,
}

impl TokioScheduler {
    /// Create a scheduler and the receiving end of its wake channel
    pub fn new(clock: Arc<dyn Clock>) -> (Self, mpsc::UnboundedReceiver<WakeToken>) {
        let (wake_tx, wake_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            clock,
            wake_tx,
            pending: Mutex::new(None),
            generation: AtomicU64::new(0),
        };
        (scheduler, wake_rx)
    }

    /// Claim a delivered wake. Returns false for a token that was superseded
    /// by a later `request_wake` or already claimed, so at most one wake is
    /// fulfilled per request.
    pub fn accept(&self, token: WakeToken) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        match pending.as_ref() {
            Some(wake) if wake.generation == token.generation => {
                *pending = None;
                true
            }
            _ => {
                log::debug!("Dropping stale wake (generation {})", token.generation);
                false
            }
        }
    }

    /// Abort the pending wake, if any
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(wake) = pending.take() {
            wake.handle.abort();
            log::info!("Cancelled pending wake (generation {})", wake.generation);
        }
    }

    /// Whether a wake is currently armed
    pub fn is_armed(&self) -> bool {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

impl Scheduler for TokioScheduler {
    fn request_wake(&self, delay: Duration) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.take() {
            previous.handle.abort();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let delay_ms = delay.as_millis() as u64;
        let deadline_ms = self.clock.now_ms().saturating_add(delay_ms);
        let wake_tx = self.wake_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the loop is shutting down
            let _ = wake_tx.send(WakeToken { generation });
        });

        *pending = Some(PendingWake {
            generation,
            deadline_ms,
            handle,
        });

        tracing::debug!(generation, delay_ms, deadline_ms, "Next wake armed");
    }

    fn next_wake_deadline(&self) -> Option<u64> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|wake| wake.deadline_ms)
    }
}

impl std::fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("next_wake_deadline", &self.next_wake_deadline())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn scheduler() -> (TokioScheduler, mpsc::UnboundedReceiver<WakeToken>, ManualClock) {
        let clock = ManualClock::new(1_000);
        let (scheduler, rx) = TokioScheduler::new(Arc::new(clock.clone()));
        (scheduler, rx, clock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_wake_fires_after_delay() {
        let (scheduler, mut rx, _clock) = scheduler();
        scheduler.request_wake(Duration::from_secs(10));
        assert_eq!(scheduler.next_wake_deadline(), Some(11_000));

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(rx.try_recv().is_err());

        let token = rx.recv().await.unwrap();
        assert_eq!(token.generation, 1);
        assert!(scheduler.accept(token));
        assert!(!scheduler.is_armed());
        assert_eq!(scheduler.next_wake_deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_replaces_pending_wake() {
        let (scheduler, mut rx, _clock) = scheduler();
        scheduler.request_wake(Duration::from_secs(5));
        scheduler.request_wake(Duration::from_secs(30));
        assert_eq!(scheduler.next_wake_deadline(), Some(31_000));

        let token = rx.recv().await.unwrap();
        assert_eq!(token.generation, 2);
        assert!(scheduler.accept(token));

        // The superseded wake never fires
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_token_rejected() {
        let (scheduler, _rx, _clock) = scheduler();
        scheduler.request_wake(Duration::from_secs(5));
        scheduler.request_wake(Duration::from_secs(5));
        assert!(!scheduler.accept(WakeToken { generation: 1 }));
        assert!(scheduler.accept(WakeToken { generation: 2 }));
        // Already claimed
        assert!(!scheduler.accept(WakeToken { generation: 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_disarms() {
        let (scheduler, mut rx, _clock) = scheduler();
        scheduler.request_wake(Duration::from_secs(1));
        scheduler.cancel();
        assert!(!scheduler.is_armed());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_uses_clock() {
        let (scheduler, _rx, clock) = scheduler();
        clock.set(50_000);
        scheduler.request_wake(Duration::from_millis(250));
        assert_eq!(scheduler.next_wake_deadline(), Some(50_250));
    }
}
