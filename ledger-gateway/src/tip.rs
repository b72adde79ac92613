use crate::backend::FailoverCallerRef;
use crate::cache::CacheSetRef;
use crate::config::TipConfig;
use crate::error::GatewayResult;
use crate::query::{is_synced_percentage, sync_percentage};
use crate::status::SyncStatusManagerRef;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
    pub height: u64,
    pub hash: Option<String>,
}

pub type ChainTipRef = Arc<RwLock<ChainTip>>;

/// Service level notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    Block(String),
    Transaction(String),
    Tip(u64),
    Synced(u64),
}

#[derive(Default)]
struct DebounceState {
    last_processed: Option<Instant>,

    // Armed timer that is still sleeping. A fired timer clears it before
    // starting the update, so only sleeping timers are ever aborted.
    pending: Option<JoinHandle<()>>,

    // Bumped by every event, a timer that finds a newer generation is stale
    generation: u64,
}

/// Follows the chain tip and drops tip scoped caches whenever it moves.
/// Bursts of block events are rate limited to one update per debounce window,
/// the last hash of a burst wins.
pub struct TipTracker {
    failover: FailoverCallerRef,
    caches: CacheSetRef,
    tip: ChainTipRef,
    status: SyncStatusManagerRef,
    events: broadcast::Sender<ChainEvent>,
    debounce_window: Duration,
    debounce: Mutex<DebounceState>,

    // Tip updates run one at a time
    update_lock: tokio::sync::Mutex<()>,
}

impl TipTracker {
    pub fn new(
        config: &TipConfig,
        failover: FailoverCallerRef,
        caches: CacheSetRef,
        tip: ChainTipRef,
        status: SyncStatusManagerRef,
        events: broadcast::Sender<ChainEvent>,
    ) -> Self {
        Self {
            failover,
            caches,
            tip,
            status,
            events,
            debounce_window: config.debounce_window(),
            debounce: Mutex::new(DebounceState::default()),
            update_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn tip(&self) -> ChainTip {
        self.tip.read().unwrap().clone()
    }

    /// Loads the backend's best block as the initial tip. Caches are not touched.
    pub async fn init_tip(&self) -> GatewayResult<ChainTip> {
        let _guard = self.update_lock.lock().await;

        let hash = self
            .failover
            .try_all("getbestblockhash", |backend| async move {
                backend.get_best_block_hash().await
            })
            .await?;
        let hash = hash.as_str();
        let header = self
            .failover
            .try_all("getblockheader", |backend| async move {
                backend.get_block_header(hash).await
            })
            .await?;

        let tip = ChainTip {
            height: header.height,
            hash: Some(hash.to_string()),
        };
        *self.tip.write().unwrap() = tip.clone();
        self.status.update_tip(header.height, hash);
        info!("Initial chain tip {} at height {}", hash, header.height);

        let _ = self.events.send(ChainEvent::Tip(header.height));
        Ok(tip)
    }

    /// Handles a new block notification.
    pub fn on_block(self: &Arc<Self>, hash: String) {
        let now = Instant::now();
        let mut state = self.debounce.lock().unwrap();

        // A newer hash always supersedes a deferred one
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        state.generation += 1;
        let generation = state.generation;

        let elapsed = state.last_processed.map(|last| now.duration_since(last));
        match elapsed {
            Some(elapsed) if elapsed <= self.debounce_window => {
                let delay = self.debounce_window - elapsed;
                debug!("Deferring tip update to {} by {:?}", hash, delay);

                let tracker = self.clone();
                state.pending = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;

                    let mut state = tracker.debounce.lock().unwrap();
                    if state.generation != generation {
                        return;
                    }
                    state.pending = None;
                    state.last_processed = Some(Instant::now());
                    tracker.spawn_update(hash);
                }));
            }
            _ => {
                state.last_processed = Some(now);
                self.spawn_update(hash);
            }
        }
    }

    // Updates run in their own task so a later event can never cancel one
    // that has already started.
    fn spawn_update(self: &Arc<Self>, hash: String) {
        let tracker = self.clone();
        tokio::spawn(async move {
            tracker.update_tip(&hash).await;
        });
    }

    /// Moves the tip to `hash`. Returns false when it already was the tip or
    /// its height could not be read, in which case the tip is left untouched
    /// and a repeated event for the same hash retries.
    pub async fn update_tip(&self, hash: &str) -> bool {
        let _guard = self.update_lock.lock().await;

        if self.tip.read().unwrap().hash.as_deref() == Some(hash) {
            debug!("Block {} is already the tip", hash);
            return false;
        }

        let header = self
            .failover
            .try_all("getblockheader", |backend| async move {
                backend.get_block_header(hash).await
            })
            .await;
        let height = match header {
            Ok(header) => header.height,
            Err(e) => {
                error!("Failed to get height of new tip {}: {}", hash, e);
                return false;
            }
        };

        *self.tip.write().unwrap() = ChainTip {
            height,
            hash: Some(hash.to_string()),
        };
        self.caches.reset_tip_scoped();
        self.status.update_tip(height, hash);
        info!("Chain tip moved to {} at height {}", hash, height);
        let _ = self.events.send(ChainEvent::Tip(height));

        match sync_percentage(&self.failover).await {
            Ok(percentage) => {
                if self.status.update_progress(percentage) {
                    info!("Backend caught up at height {}", height);
                }
                if is_synced_percentage(percentage) {
                    let _ = self.events.send(ChainEvent::Synced(height));
                } else {
                    info!("Backend sync progress: {:.2}%", percentage);
                }
            }
            Err(e) => warn!("Failed to get sync progress: {}", e),
        }

        true
    }

    pub fn shutdown(&self) {
        if let Some(pending) = self.debounce.lock().unwrap().pending.take() {
            debug!("Cancelling pending tip update");
            pending.abort();
        }
    }
}

pub type TipTrackerRef = Arc<TipTracker>;
