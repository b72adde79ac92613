use crate::backend::{FailoverCallerRef, RawTransaction};
use crate::query::sync_percentage;
use crate::status::SyncStatusManagerRef;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

/// A notification from the chain, delivered at least once and in no
/// particular order.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Block(String),
    Transaction(RawTransaction),
}

pub type FeedSender = mpsc::UnboundedSender<FeedEvent>;
pub type FeedReceiver = mpsc::UnboundedReceiver<FeedEvent>;

pub fn feed_channel() -> (FeedSender, FeedReceiver) {
    mpsc::unbounded_channel()
}

/// Polls the best block hash and pushes a block event whenever it changes.
/// Other transports can push into the same feed through a cloned sender.
pub struct BestBlockPoller {
    failover: FailoverCallerRef,
    status: SyncStatusManagerRef,
    interval: Duration,
    sender: FeedSender,
}

impl BestBlockPoller {
    pub fn new(
        failover: FailoverCallerRef,
        status: SyncStatusManagerRef,
        interval: Duration,
        sender: FeedSender,
    ) -> Self {
        Self {
            failover,
            status,
            interval,
            sender,
        }
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<()>) {
        info!("Best block poller started, interval {:?}", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_hash = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.poll_once(&mut last_hash).await {
                        warn!("Feed channel closed, stopping best block poller");
                        break;
                    }
                }
                _ = shutdown.changed() => {
                    info!("Best block poller received shutdown signal");
                    break;
                }
            }
        }
    }

    /// One poll round. Returns false once the feed has no receiver left.
    pub async fn poll_once(&self, last_hash: &mut Option<String>) -> bool {
        match self
            .failover
            .call_once("getbestblockhash", |backend| async move {
                backend.get_best_block_hash().await
            })
            .await
        {
            Ok(hash) if last_hash.as_deref() != Some(hash.as_str()) => {
                debug!("Best block changed to {}", hash);
                *last_hash = Some(hash.clone());
                if self.sender.send(FeedEvent::Block(hash)).is_err() {
                    return false;
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to poll best block hash: {}", e),
        }

        match sync_percentage(&self.failover).await {
            Ok(percentage) => {
                if self.status.update_progress(percentage) {
                    info!("Backend is synced, progress {:.4}%", percentage);
                }
            }
            Err(e) => warn!("Failed to poll sync progress: {}", e),
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::query::fixture;
    use crate::status::{SyncPhase, SyncStatusManager};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_poll_emits_only_changes() {
        let backend = Arc::new(MockBackend::new("node"));
        backend.set_best_block_hash("block-1");
        backend.set_verification_progress(0.5);
        let status = Arc::new(SyncStatusManager::new(0.9999));
        let (tx, mut rx) = feed_channel();
        let poller = BestBlockPoller::new(
            fixture::failover(&[backend.clone()]),
            status.clone(),
            Duration::from_secs(15),
            tx,
        );

        let mut last = None;
        assert!(poller.poll_once(&mut last).await);
        assert!(poller.poll_once(&mut last).await);
        assert_eq!(rx.try_recv().unwrap(), FeedEvent::Block("block-1".to_string()));
        assert!(rx.try_recv().is_err());
        assert_eq!(status.get_status().phase, SyncPhase::CatchingUp);

        backend.set_best_block_hash("block-2");
        backend.set_verification_progress(1.0);
        assert!(poller.poll_once(&mut last).await);
        assert_eq!(rx.try_recv().unwrap(), FeedEvent::Block("block-2".to_string()));
        assert_eq!(status.get_status().phase, SyncPhase::Synced);

        drop(rx);
        backend.set_best_block_hash("block-3");
        assert!(!poller.poll_once(&mut last).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let backend = Arc::new(MockBackend::new("node"));
        backend.set_best_block_hash("block-1");
        let (tx, mut rx) = feed_channel();
        let poller = Arc::new(BestBlockPoller::new(
            fixture::failover(&[backend]),
            Arc::new(SyncStatusManager::new(0.9999)),
            Duration::from_secs(15),
            tx,
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let handle = tokio::spawn({
            let poller = poller.clone();
            async move { poller.run(shutdown_rx).await }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(rx.recv().await, Some(FeedEvent::Block("block-1".to_string())));

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
