use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncPhase {
    Initializing = 0,
    CatchingUp = 1,
    Synced = 2,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub height: u64,
    pub best_block_hash: Option<String>,
    // Backend verification progress, 0..=100
    pub progress: f64,
    pub message: Option<String>,
}

/// Backend sync state as last observed by the tip tracker and the poller.
pub struct SyncStatusManager {
    status: Mutex<SyncStatus>,
    synced_threshold: f64,
}

impl SyncStatusManager {
    /// `synced_threshold` is the verification progress fraction from which the
    /// backend counts as caught up.
    pub fn new(synced_threshold: f64) -> Self {
        let status = SyncStatus {
            phase: SyncPhase::Initializing,
            height: 0,
            best_block_hash: None,
            progress: 0.0,
            message: None,
        };

        Self {
            status: Mutex::new(status),
            synced_threshold,
        }
    }

    pub fn update_tip(&self, height: u64, hash: &str) {
        let mut status = self.status.lock().unwrap();
        status.height = height;
        status.best_block_hash = Some(hash.to_string());
    }

    /// Returns true when this update moved the backend into the synced phase.
    pub fn update_progress(&self, percentage: f64) -> bool {
        let mut status = self.status.lock().unwrap();
        status.progress = percentage;

        let phase = if percentage / 100.0 >= self.synced_threshold {
            SyncPhase::Synced
        } else {
            SyncPhase::CatchingUp
        };
        let became_synced = phase == SyncPhase::Synced && status.phase != SyncPhase::Synced;
        status.phase = phase;

        became_synced
    }

    pub fn update_message(&self, message: Option<String>) {
        let mut status = self.status.lock().unwrap();
        status.message = message;
    }

    pub fn get_status(&self) -> SyncStatus {
        let status = self.status.lock().unwrap();
        status.clone()
    }
}

pub type SyncStatusManagerRef = std::sync::Arc<SyncStatusManager>;
