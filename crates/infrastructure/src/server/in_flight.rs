use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Counts messages being served, for graceful stop.
///
/// The count starts at one. That extra unit is a barrier removed by
/// [`InFlight::drain`], so a stop racing with the first message can never
/// see zero before the message was counted.
pub struct InFlight {
    count: watch::Sender<usize>,
    barrier: AtomicBool,
}

pub struct InFlightGuard {
    owner: Arc<InFlight>,
}

impl InFlight {
    pub fn new() -> Arc<Self> {
        let (count, _) = watch::channel(1);
        Arc::new(Self {
            count,
            barrier: AtomicBool::new(true),
        })
    }

    pub fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.send_modify(|n| *n += 1);
        InFlightGuard {
            owner: Arc::clone(self),
        }
    }

    /// Messages in flight, excluding the barrier.
    pub fn pending(&self) -> usize {
        let n = *self.count.borrow();
        if self.barrier.load(Ordering::Acquire) {
            n.saturating_sub(1)
        } else {
            n
        }
    }

    /// Remove the barrier and wait up to `grace` for the count to reach
    /// zero. Returns whether it did.
    pub async fn drain(&self, grace: Duration) -> bool {
        if self.barrier.swap(false, Ordering::AcqRel) {
            self.count.send_modify(|n| *n = n.saturating_sub(1));
        }
        let mut rx = self.count.subscribe();
        let drained = matches!(
            tokio::time::timeout(grace, rx.wait_for(|n| *n == 0)).await,
            Ok(Ok(_))
        );
        drained
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.owner.count.send_modify(|n| *n = n.saturating_sub(1));
    }
}
