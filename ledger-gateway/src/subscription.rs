use crate::backend::RawTransaction;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    HashBlock,
    RawTransaction,
}

impl EventKind {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::HashBlock => "ledger/hashblock",
            Self::RawTransaction => "ledger/rawtransaction",
        }
    }
}

pub const ADDRESS_TXID_EVENT: &str = "ledger/addresstxid";

/// Names of every event a subscriber can receive.
pub fn publish_events() -> Vec<&'static str> {
    vec![
        EventKind::RawTransaction.event_name(),
        EventKind::HashBlock.event_name(),
        ADDRESS_TXID_EVENT,
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    HashBlock(String),
    // Serialized transaction
    RawTransaction(String),
    AddressTxid { address: String, txid: String },
}

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// One connected client. Handles compare equal by id only.
#[derive(Debug, Clone)]
pub struct Subscriber {
    id: u64,
    remote_address: String,
    sender: mpsc::UnboundedSender<Notification>,
}

impl Subscriber {
    pub fn new(remote_address: &str) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscriber = Self {
            id: NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed),
            remote_address: remote_address.to_string(),
            sender,
        };

        (subscriber, receiver)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn remote_address(&self) -> &str {
        &self.remote_address
    }

    fn send(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            debug!(
                "Subscriber {} ({}) is gone, dropping notification",
                self.id, self.remote_address
            );
        }
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subscriber {}

#[derive(Default)]
struct SubscriptionTable {
    events: HashMap<EventKind, Vec<Subscriber>>,
    addresses: HashMap<String, Vec<Subscriber>>,
}

/// Routes block and transaction notifications to interested subscribers.
#[derive(Default)]
pub struct SubscriptionRouter {
    table: Mutex<SubscriptionTable>,
}

impl SubscriptionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: EventKind, subscriber: &Subscriber) {
        let mut table = self.table.lock().unwrap();
        let list = table.events.entry(kind).or_default();
        if !list.contains(subscriber) {
            info!(
                "{} subscribed to {}, total: {}",
                subscriber.remote_address,
                kind.event_name(),
                list.len() + 1
            );
            list.push(subscriber.clone());
        }
    }

    pub fn unsubscribe(&self, kind: EventKind, subscriber: &Subscriber) {
        let mut table = self.table.lock().unwrap();
        if let Some(list) = table.events.get_mut(&kind) {
            list.retain(|s| s != subscriber);
            info!(
                "{} unsubscribed from {}, total: {}",
                subscriber.remote_address,
                kind.event_name(),
                list.len()
            );
            if list.is_empty() {
                table.events.remove(&kind);
            }
        }
    }

    pub fn subscribe_address(&self, subscriber: &Subscriber, addresses: &[String]) {
        let mut table = self.table.lock().unwrap();
        for address in addresses.iter().filter(|a| !a.is_empty()) {
            let list = table.addresses.entry(address.clone()).or_default();
            if !list.contains(subscriber) {
                list.push(subscriber.clone());
            }
        }
    }

    /// Removes `subscriber` from the given addresses, or from every address
    /// when `addresses` is `None`.
    pub fn unsubscribe_address(&self, subscriber: &Subscriber, addresses: Option<&[String]>) {
        let mut table = self.table.lock().unwrap();

        let targets: Vec<String> = match addresses {
            Some(addresses) => addresses.to_vec(),
            None => table.addresses.keys().cloned().collect(),
        };

        for address in targets {
            let Some(list) = table.addresses.get_mut(&address) else {
                continue;
            };
            list.retain(|s| s != subscriber);
            if list.is_empty() {
                table.addresses.remove(&address);
            }
        }
    }

    /// Drops every subscription of a disconnected client.
    pub fn remove_subscriber(&self, subscriber: &Subscriber) {
        self.unsubscribe(EventKind::HashBlock, subscriber);
        self.unsubscribe(EventKind::RawTransaction, subscriber);
        self.unsubscribe_address(subscriber, None);
    }

    fn event_subscribers(&self, kind: EventKind) -> Vec<Subscriber> {
        let table = self.table.lock().unwrap();
        table.events.get(&kind).cloned().unwrap_or_default()
    }

    pub fn notify_block(&self, hash: &str) {
        for subscriber in self.event_subscribers(EventKind::HashBlock) {
            subscriber.send(Notification::HashBlock(hash.to_string()));
        }
    }

    pub fn notify_transaction(&self, tx: &RawTransaction) {
        for subscriber in self.event_subscribers(EventKind::RawTransaction) {
            subscriber.send(Notification::RawTransaction(tx.hex.clone()));
        }

        let addresses = addresses_from_transaction(tx);
        let targets: Vec<(String, Subscriber)> = {
            let table = self.table.lock().unwrap();
            addresses
                .into_iter()
                .filter_map(|address| {
                    table
                        .addresses
                        .get(&address)
                        .map(|list| (address, list.clone()))
                })
                .flat_map(|(address, list)| list.into_iter().map(move |s| (address.clone(), s)))
                .collect()
        };

        for (address, subscriber) in targets {
            subscriber.send(Notification::AddressTxid {
                address,
                txid: tx.txid.clone(),
            });
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        let table = self.table.lock().unwrap();
        table.events.get(&kind).map(|l| l.len()).unwrap_or(0)
    }

    pub fn address_count(&self) -> usize {
        self.table.lock().unwrap().addresses.len()
    }

    pub fn address_subscriber_count(&self, address: &str) -> usize {
        let table = self.table.lock().unwrap();
        table.addresses.get(address).map(|l| l.len()).unwrap_or(0)
    }
}

/// Input (previous output) and output addresses of `tx`, first seen order.
pub fn addresses_from_transaction(tx: &RawTransaction) -> Vec<String> {
    let mut seen = HashSet::new();
    let inputs = tx
        .vin
        .iter()
        .filter_map(|input| input.prev_out.as_ref())
        .flat_map(|prev| prev.addresses.iter());
    let outputs = tx
        .vout
        .iter()
        .flat_map(|output| output.script_pub_key.addresses.iter());

    inputs
        .chain(outputs)
        .filter(|a| seen.insert(a.as_str()))
        .cloned()
        .collect()
}
