use crate::backend::{
    ChainBackendRef, EndpointPool, FailoverCaller, FailoverCallerRef, RpcEndpoint,
};
use crate::cache::{CacheSet, CacheSetRef};
use crate::config::GatewayConfigRef;
use crate::feed::{BestBlockPoller, FeedEvent, FeedReceiver, FeedSender, feed_channel};
use crate::query::{QueryEngine, QueryEngineRef};
use crate::status::{SyncStatus, SyncStatusManager, SyncStatusManagerRef};
use crate::subscription::{EventKind, Subscriber, SubscriptionRouter};
use crate::tip::{ChainEvent, ChainTip, TipTracker, TipTrackerRef};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{broadcast, watch};

const CHAIN_EVENT_CAPACITY: usize = 1024;

/// One gateway instance: backend access, caches, queries, tip tracking and
/// subscriptions over a shared set of endpoints.
pub struct LedgerGateway {
    config: GatewayConfigRef,
    failover: FailoverCallerRef,
    caches: CacheSetRef,
    query: QueryEngineRef,
    tip: TipTrackerRef,
    router: Arc<SubscriptionRouter>,
    status: SyncStatusManagerRef,
    events: broadcast::Sender<ChainEvent>,
    feed: FeedSender,
    feed_receiver: Mutex<Option<FeedReceiver>>,
}

impl LedgerGateway {
    /// Connects to the endpoints listed in the config.
    pub fn new(config: GatewayConfigRef) -> Result<Self, String> {
        let backends = config
            .endpoints
            .iter()
            .map(|endpoint| Arc::new(RpcEndpoint::new(endpoint)) as ChainBackendRef)
            .collect();

        Self::with_backends(config, backends)
    }

    pub fn with_backends(
        config: GatewayConfigRef,
        backends: Vec<ChainBackendRef>,
    ) -> Result<Self, String> {
        let pool = Arc::new(EndpointPool::new(backends)?);
        let failover = Arc::new(FailoverCaller::new(
            pool,
            config.failover.try_all_interval(),
        ));
        let caches = Arc::new(CacheSet::new(&config.cache));
        let chain_tip = Arc::new(RwLock::new(ChainTip::default()));
        let status = Arc::new(SyncStatusManager::new(config.tip.sync_progress_threshold));
        let (events, _) = broadcast::channel(CHAIN_EVENT_CAPACITY);

        let query = Arc::new(QueryEngine::new(
            config.query.clone(),
            failover.clone(),
            caches.clone(),
            chain_tip.clone(),
        ));
        let tip = Arc::new(TipTracker::new(
            &config.tip,
            failover.clone(),
            caches.clone(),
            chain_tip,
            status.clone(),
            events.clone(),
        ));
        let (feed, feed_receiver) = feed_channel();

        Ok(Self {
            config,
            failover,
            caches,
            query,
            tip,
            router: Arc::new(SubscriptionRouter::new()),
            status,
            events,
            feed,
            feed_receiver: Mutex::new(Some(feed_receiver)),
        })
    }

    pub fn config(&self) -> &GatewayConfigRef {
        &self.config
    }

    pub fn query(&self) -> &QueryEngineRef {
        &self.query
    }

    pub fn caches(&self) -> &CacheSetRef {
        &self.caches
    }

    pub fn tip(&self) -> ChainTip {
        self.tip.tip()
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.status.get_status()
    }

    pub fn router(&self) -> &Arc<SubscriptionRouter> {
        &self.router
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ChainEvent> {
        self.events.subscribe()
    }

    /// Sender for external notification transports.
    pub fn feed_sender(&self) -> FeedSender {
        self.feed.clone()
    }

    pub fn subscribe(&self, kind: EventKind, subscriber: &Subscriber) {
        self.router.subscribe(kind, subscriber);
    }

    pub fn unsubscribe(&self, kind: EventKind, subscriber: &Subscriber) {
        self.router.unsubscribe(kind, subscriber);
    }

    pub fn subscribe_address(&self, subscriber: &Subscriber, addresses: &[String]) {
        self.router.subscribe_address(subscriber, addresses);
    }

    pub fn unsubscribe_address(&self, subscriber: &Subscriber, addresses: Option<&[String]>) {
        self.router.unsubscribe_address(subscriber, addresses);
    }

    /// Loads the initial tip. A backend that is not reachable yet is not
    /// fatal, the poller picks the tip up later.
    pub async fn start(&self) {
        match self.tip.init_tip().await {
            Ok(tip) => info!("Gateway started at height {}", tip.height),
            Err(e) => warn!("Failed to load initial chain tip, will retry from the feed: {}", e),
        }
    }

    pub fn handle_feed_event(&self, event: FeedEvent) {
        match event {
            FeedEvent::Block(hash) => {
                let _ = self.events.send(ChainEvent::Block(hash.clone()));
                self.router.notify_block(&hash);
                self.tip.on_block(hash);
            }
            FeedEvent::Transaction(tx) => {
                let _ = self.events.send(ChainEvent::Transaction(tx.txid.clone()));
                self.router.notify_transaction(&tx);
            }
        }
    }

    /// Runs the best block poller and the feed consumer until `shutdown` fires.
    pub async fn run(&self, shutdown: watch::Receiver<()>) -> Result<(), String> {
        let mut receiver = self.feed_receiver.lock().unwrap().take().ok_or_else(|| {
            let msg = "Gateway feed is already running".to_string();
            error!("{}", msg);
            msg
        })?;

        let poller = BestBlockPoller::new(
            self.failover.clone(),
            self.status.clone(),
            self.config.tip.poll_interval(),
            self.feed.clone(),
        );

        let poll_task = poller.run(shutdown.clone());
        let mut shutdown = shutdown;
        let consume_task = async {
            loop {
                tokio::select! {
                    event = receiver.recv() => match event {
                        Some(event) => self.handle_feed_event(event),
                        None => break,
                    },
                    _ = shutdown.changed() => {
                        info!("Feed consumer received shutdown signal");
                        break;
                    }
                }
            }
        };

        tokio::join!(poll_task, consume_task);
        self.tip.shutdown();
        info!("Gateway feed stopped");

        Ok(())
    }
}

pub type LedgerGatewayRef = Arc<LedgerGateway>;
