use super::{ChainBackendRef, EndpointPoolRef};
use crate::error::{BackendResult, GatewayError, GatewayResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Runs backend operations across the endpoint pool, moving on to the next
/// endpoint after a failure.
pub struct FailoverCaller {
    pool: EndpointPoolRef,
    interval: Duration,
}

impl FailoverCaller {
    pub fn new(pool: EndpointPoolRef, interval: Duration) -> Self {
        Self { pool, interval }
    }

    pub fn pool(&self) -> &EndpointPoolRef {
        &self.pool
    }

    /// Tries `op` on each endpoint at most once, starting at the pool cursor,
    /// sleeping `interval` between attempts. Exhaustion returns the last error.
    pub async fn try_all<T, F, Fut>(&self, method: &str, op: F) -> GatewayResult<T>
    where
        F: Fn(ChainBackendRef) -> Fut,
        Fut: Future<Output = BackendResult<T>>,
    {
        let attempts = self.pool.len();
        let start = self.pool.next_index();
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.interval).await;
            }

            let endpoint = self.pool.get(start + attempt);
            match op(endpoint.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        "{} failed on {} (attempt {}/{}): {}",
                        method,
                        endpoint.name(),
                        attempt + 1,
                        attempts,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => {
                error!("{} failed on all {} endpoint(s): {}", method, attempts, e);
                Err(e.into())
            }
            None => Err(GatewayError::Internal(format!(
                "{} has no endpoint to run on",
                method
            ))),
        }
    }

    /// Single attempt on the next endpoint, for non-idempotent or cheap calls.
    pub async fn call_once<T, F, Fut>(&self, method: &str, op: F) -> GatewayResult<T>
    where
        F: FnOnce(ChainBackendRef) -> Fut,
        Fut: Future<Output = BackendResult<T>>,
    {
        let endpoint = self.pool.client();
        op(endpoint.clone()).await.map_err(|e| {
            error!("{} failed on {}: {}", method, endpoint.name(), e);
            e.into()
        })
    }
}

pub type FailoverCallerRef = Arc<FailoverCaller>;
