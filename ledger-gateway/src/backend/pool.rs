use super::ChainBackendRef;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Ordered, fixed set of backend endpoints with a shared round-robin cursor.
pub struct EndpointPool {
    endpoints: Vec<ChainBackendRef>,
    cursor: AtomicUsize,
}

impl EndpointPool {
    pub fn new(endpoints: Vec<ChainBackendRef>) -> Result<Self, String> {
        if endpoints.is_empty() {
            let msg = "At least one backend endpoint must be configured".to_string();
            error!("{}", msg);
            return Err(msg);
        }

        info!(
            "Endpoint pool created with {} endpoint(s): {}",
            endpoints.len(),
            endpoints
                .iter()
                .map(|e| e.name().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            endpoints,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn get(&self, index: usize) -> ChainBackendRef {
        self.endpoints[index % self.endpoints.len()].clone()
    }

    /// Returns the current cursor position and advances it, wrapping around.
    pub fn next_index(&self) -> usize {
        let len = self.endpoints.len();
        match self
            .cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| Some((i + 1) % len))
        {
            Ok(prev) | Err(prev) => prev,
        }
    }

    /// The next endpoint in round-robin order.
    pub fn client(&self) -> ChainBackendRef {
        self.get(self.next_index())
    }
}

pub type EndpointPoolRef = Arc<EndpointPool>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;

    #[test]
    fn test_round_robin_wraps() {
        let endpoints: Vec<ChainBackendRef> = (0..3)
            .map(|i| Arc::new(MockBackend::new(&format!("node{}", i))) as ChainBackendRef)
            .collect();
        let pool = EndpointPool::new(endpoints).unwrap();

        let names: Vec<String> = (0..7).map(|_| pool.client().name().to_string()).collect();
        assert_eq!(
            names,
            vec!["node0", "node1", "node2", "node0", "node1", "node2", "node0"]
        );
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(EndpointPool::new(vec![]).is_err());
    }
}
