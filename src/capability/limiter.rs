/// Concurrency Limiter - process-wide admission gate for directory queries
use crate::{
    error::{AppError, AppResult},
    metrics,
};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting semaphore shared by every resolution path
#[derive(Clone, Debug)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Held while a directory query is in flight; dropping it releases the slot
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Create a limiter with a fixed number of slots (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Refuse all further acquisitions; waiters are woken with an error
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Wait for a free slot
    pub async fn acquire(&self) -> AppResult<LimiterPermit> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal(format!("Concurrency limiter closed: {}", e)))?;

        metrics::DIRECTORY_QUERIES_IN_FLIGHT.inc();
        Ok(LimiterPermit { _permit: permit })
    }
}

impl Drop for LimiterPermit {
    fn drop(&mut self) {
        metrics::DIRECTORY_QUERIES_IN_FLIGHT.dec();
    }
}
