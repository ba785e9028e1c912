//! Per-product exclusive access for the commit engine.
//!
//! Mutation of a product's stock record during checkout requires the
//! product's lease from a [`ProductLockManager`]. Leases are plain async
//! mutexes keyed by product id; callers acquire them in sorted-id order
//! (see [`OrderIntent::distinct_product_ids`]), which gives lock
//! acquisition a global total order and makes it deadlock-free without a
//! deadlock detector.
//!
//! [`OrderIntent::distinct_product_ids`]: crate::order::OrderIntent::distinct_product_ids

use crate::errors::{CommitError, CommitResult};
use crate::types::ProductId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

/// Configuration for lock acquisition retry behavior.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// How long a single acquisition attempt may wait.
    pub acquire_timeout: Duration,
    /// Maximum number of acquisition attempts per product.
    pub max_attempts: u32,
    /// Base delay between attempts.
    pub base_delay: Duration,
    /// Maximum delay between attempts (for exponential backoff).
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            acquire_timeout: Duration::from_secs(5),
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
        }
    }
}

impl LockConfig {
    /// A configuration for high-throughput scenarios where fast failure is
    /// preferred over persistence.
    pub const fn fast() -> Self {
        Self {
            acquire_timeout: Duration::from_millis(250),
            max_attempts: 2,
            base_delay: Duration::from_millis(25),
            max_delay: Duration::from_millis(500),
            backoff_multiplier: 1.5,
        }
    }

    /// A configuration for fault-tolerant scenarios where eventual success
    /// is preferred over fast failure.
    pub const fn patient() -> Self {
        Self {
            acquire_timeout: Duration::from_secs(10),
            max_attempts: 10,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.5,
        }
    }

    /// Calculates the delay before the next acquisition attempt.
    ///
    /// Exponential backoff with ±25% jitter to avoid thundering-herd
    /// retries when several commits contend for the same product.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    fn retry_delay(&self, attempt: u32) -> Duration {
        use rand::Rng;

        let base_delay_ms = self.base_delay.as_millis() as f64;
        let max_delay_ms = self.max_delay.as_millis() as f64;

        let delay = base_delay_ms * self.backoff_multiplier.powi(attempt as i32);
        let delay = delay.min(max_delay_ms);

        let mut rng = rand::rng();
        let jitter = delay * 0.25 * (rng.random::<f64>() - 0.5) * 2.0;
        let final_delay = (delay + jitter).max(0.0).min(max_delay_ms) as u64;

        Duration::from_millis(final_delay)
    }
}

/// The exclusive leases held by one commit attempt.
///
/// Dropping the set releases the leases in reverse acquisition order.
/// Guards are owned, so the set may be held across await points.
#[derive(Debug)]
pub struct LockSet {
    guards: Vec<OwnedMutexGuard<()>>,
}

impl LockSet {
    /// How many product leases the set holds.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Whether the set holds no leases.
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl Drop for LockSet {
    fn drop(&mut self) {
        // Release in reverse acquisition order
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

/// Hands out per-product exclusive leases.
///
/// One lease exists per product id; leases are created on first use and
/// kept for the manager's lifetime, so repeated commits for the same
/// product contend on the same mutex.
#[derive(Debug, Default)]
pub struct ProductLockManager {
    leases: StdMutex<HashMap<ProductId, Arc<Mutex<()>>>>,
}

impl ProductLockManager {
    /// Creates an empty lock manager.
    pub fn new() -> Self {
        Self::default()
    }

    fn lease(&self, product_id: &ProductId) -> Arc<Mutex<()>> {
        let mut leases = self.leases.lock().expect("lease map poisoned");
        Arc::clone(
            leases
                .entry(product_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Acquires exclusive leases for all given products, in the order
    /// given.
    ///
    /// Callers must pass product ids in sorted order — the caller-visible
    /// half of the deadlock-freedom contract. Each lease is attempted up
    /// to `config.max_attempts` times, each attempt bounded by
    /// `config.acquire_timeout`, with jittered exponential backoff between
    /// attempts.
    ///
    /// # Errors
    /// Returns [`CommitError::Busy`] naming the contended product once its
    /// retry budget is exhausted; leases already acquired are released (in
    /// reverse order) before returning.
    pub async fn acquire_all(
        &self,
        product_ids: &[ProductId],
        config: &LockConfig,
    ) -> CommitResult<LockSet> {
        debug_assert!(
            product_ids.windows(2).all(|w| w[0] < w[1]),
            "lock acquisition requires sorted, distinct product ids"
        );

        let mut set = LockSet { guards: Vec::with_capacity(product_ids.len()) };
        for product_id in product_ids {
            let guard = self.acquire_one(product_id, config).await?;
            set.guards.push(guard);
        }
        Ok(set)
    }

    async fn acquire_one(
        &self,
        product_id: &ProductId,
        config: &LockConfig,
    ) -> CommitResult<OwnedMutexGuard<()>> {
        let lease = self.lease(product_id);

        for attempt in 0..config.max_attempts {
            match tokio::time::timeout(config.acquire_timeout, Arc::clone(&lease).lock_owned())
                .await
            {
                Ok(guard) => return Ok(guard),
                Err(_elapsed) => {
                    let remaining = config.max_attempts - attempt - 1;
                    warn!(
                        product_id = %product_id,
                        attempt = attempt + 1,
                        remaining,
                        "lock acquisition timed out"
                    );
                    if remaining > 0 {
                        tokio::time::sleep(config.retry_delay(attempt)).await;
                    }
                }
            }
        }

        Err(CommitError::Busy {
            product_id: product_id.clone(),
            attempts: config.max_attempts,
        })
    }
}
