//! Pool of interchangeable resource tokens with all-or-nothing group acquisition.
//!
//! ## Overview
//!
//! A [`ResourcePool`] owns a fixed multiset of [`ResourceToken`]s.
//! [`ResourcePool::acquire`] suspends until `quantity` tokens are free *at the same time*, then takes all of them
//! inside one critical section; a caller never holds part of its request while waiting for the rest.
//! Tokens come back through the [`Allocation`] guard, on drop or via [`ResourcePool::release`].
//!
//! Waiters are woken on every release and additionally re-check on a bounded interval.
//! Grants are not FIFO: whichever waiter next observes enough free tokens wins, so a large request
//! can starve behind a stream of small ones.
use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use batchrun_model::ResourceToken;
use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::error::PoolError;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct ResourcePool {
    free: Mutex<Vec<ResourceToken>>,
    capacity: usize,
    released: Notify,
    poll_interval: Duration,
}

impl ResourcePool {
    /// Build a pool from its initial token set.
    ///
    /// Duplicate values are allowed and count as separate slots.
    pub fn new<I, T>(tokens: I) -> Result<Self, PoolError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ResourceToken>,
    {
        let free: Vec<ResourceToken> = tokens.into_iter().map(Into::into).collect();
        if free.is_empty() {
            return Err(PoolError::Empty);
        }
        Ok(Self {
            capacity: free.len(),
            free: Mutex::new(free),
            released: Notify::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Upper bound on how long a waiter sleeps between availability checks.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Total number of tokens, fixed for the pool's lifetime.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tokens currently in the pool.
    pub fn available(&self) -> usize {
        self.lock().len()
    }

    /// Tokens currently held by allocations.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.available()
    }

    /// Sorted copy of the free tokens.
    pub fn snapshot(&self) -> Vec<ResourceToken> {
        let mut free = self.lock().clone();
        free.sort();
        free
    }

    /// Reject requests that could never be satisfied.
    pub fn check(&self, quantity: usize) -> Result<(), PoolError> {
        if quantity == 0 {
            return Err(PoolError::ZeroQuantity);
        }
        if quantity > self.capacity {
            return Err(PoolError::ExceedsCapacity {
                requested: quantity,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Wait until `quantity` tokens are free and take them all at once.
    ///
    /// Fails immediately (never blocks) if `quantity` is zero or exceeds [`ResourcePool::capacity`].
    pub async fn acquire(self: &Arc<Self>, quantity: usize) -> Result<Allocation, PoolError> {
        self.check(quantity)?;
        loop {
            // Register for the next release before checking, so a release that lands
            // between the check and the await still wakes us.
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(tokens) = self.take(quantity) {
                return Ok(self.grant(tokens));
            }
            trace!(target: "batchrun.pool", quantity, available = self.available(), "waiting");
            let _ = tokio::time::timeout(self.poll_interval, notified).await;
        }
    }

    /// Take `quantity` tokens if they are free right now.
    pub fn try_acquire(self: &Arc<Self>, quantity: usize) -> Result<Option<Allocation>, PoolError> {
        self.check(quantity)?;
        Ok(self.take(quantity).map(|tokens| self.grant(tokens)))
    }

    /// Return an allocation's tokens to the pool.
    pub fn release(&self, allocation: Allocation) {
        allocation.release();
    }

    fn take(&self, quantity: usize) -> Option<Vec<ResourceToken>> {
        let mut free = self.lock();
        if free.len() < quantity {
            return None;
        }
        Some(free.drain(..quantity).collect())
    }

    fn grant(self: &Arc<Self>, tokens: Vec<ResourceToken>) -> Allocation {
        debug!(
            target: "batchrun.pool",
            tokens = %ResourceToken::join(&tokens),
            available = self.available(),
            "granted"
        );
        Allocation {
            pool: Arc::clone(self),
            tokens,
        }
    }

    fn put_back(&self, tokens: &mut Vec<ResourceToken>) {
        if tokens.is_empty() {
            return;
        }
        let count = tokens.len();
        {
            let mut free = self.lock();
            free.append(tokens);
        }
        trace!(target: "batchrun.pool", count, "released");
        self.released.notify_waiters();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ResourceToken>> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ResourcePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

/// Tokens held by one execution. Dropping the guard returns them to the pool.
pub struct Allocation {
    pool: Arc<ResourcePool>,
    tokens: Vec<ResourceToken>,
}

impl Allocation {
    pub fn tokens(&self) -> &[ResourceToken] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Comma-joined token values, as injected into the resource-selector variable.
    pub fn joined(&self) -> String {
        ResourceToken::join(&self.tokens)
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        self.pool.put_back(&mut self.tokens);
    }
}

impl fmt::Debug for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Allocation").field(&self.tokens).finish()
    }
}
