use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mc_core::ViewEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::api::KnowledgeApi;

pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(30);

/// Running health poll. Polling stops when the handle is cancelled or dropped.
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn cancel(self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// One check. A failure clears the known state instead of keeping stale data.
pub(crate) async fn check_once<A: KnowledgeApi + ?Sized>(
    api: &A,
    events: &mpsc::UnboundedSender<ViewEvent>,
) {
    let _ = events.send(ViewEvent::HealthChecking);
    let health = match api.health().await {
        Ok(h) => {
            debug!(status = %h.status, "health checked");
            Some(h)
        }
        Err(e) => {
            warn!(error = %e, "health check failed");
            None
        }
    };
    let _ = events.send(ViewEvent::HealthUpdated {
        health,
        at: Utc::now(),
    });
}

/// Checks immediately, then once per `interval`.
pub fn start_health_polling<A: KnowledgeApi + 'static>(
    api: Arc<A>,
    interval: Duration,
    events: mpsc::UnboundedSender<ViewEvent>,
) -> PollerHandle {
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if events.is_closed() {
                debug!("view closed; health polling stopped");
                break;
            }
            check_once(api.as_ref(), &events).await;
        }
    });
    PollerHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use mc_core::{HealthIndicator, ViewModel};
    use std::sync::atomic::Ordering;

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_immediately_then_on_interval() {
        let api = Arc::new(FakeApi::healthy());
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = start_health_polling(api.clone(), Duration::from_secs(30), tx);

        settle().await;
        assert_eq!(api.health_calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(29)).await;
        settle().await;
        assert_eq!(api.health_calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(api.health_calls.load(Ordering::SeqCst), 2);

        handle.cancel();
        tokio::time::advance(Duration::from_secs(120)).await;
        settle().await;
        assert_eq!(api.health_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_polling() {
        let api = Arc::new(FakeApi::healthy());
        let (tx, _rx) = mpsc::unbounded_channel();
        {
            let _handle = start_health_polling(api.clone(), Duration::from_secs(30), tx);
            settle().await;
        }
        tokio::time::advance(Duration::from_secs(90)).await;
        settle().await;
        assert_eq!(api.health_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_then_recovery() {
        let api = Arc::new(FakeApi::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = start_health_polling(api.clone(), Duration::from_secs(30), tx);
        let mut vm = ViewModel::new();

        settle().await;
        while let Ok(e) = rx.try_recv() {
            vm.apply(e);
        }
        assert!(vm.health.last.is_none());
        assert_eq!(vm.health.indicator(), HealthIndicator::Offline);

        api.set_health(Some("healthy"));
        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        while let Ok(e) = rx.try_recv() {
            vm.apply(e);
        }
        assert_eq!(vm.health.indicator(), HealthIndicator::Online);
    }
}
