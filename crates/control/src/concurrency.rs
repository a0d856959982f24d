use ocr_models::OcrError;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// Global gate on simultaneous engine runs.
#[derive(Clone)]
pub struct Concurrency {
    sem: Arc<Semaphore>,
    limit: usize,
}

impl Concurrency {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            sem: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Acquire a concurrency token with RAII guard
    /// The token is automatically released when the guard is dropped
    pub async fn acquire(&self) -> Result<TokenGuard, OcrError> {
        let permit = self
            .sem
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| OcrError::InternalError {
                reason: format!("Failed to acquire concurrency token: {e}"),
            })?;
        debug!(
            "Acquired concurrency token, {} remaining",
            self.sem.available_permits()
        );
        Ok(TokenGuard { _permit: permit })
    }

    /// Try to acquire a concurrency token without waiting
    pub fn try_acquire(&self) -> Option<TokenGuard> {
        self.sem
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| TokenGuard { _permit: permit })
    }

    /// Get the number of available permits
    pub fn available_permits(&self) -> usize {
        self.sem.available_permits()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// RAII guard that holds a concurrency token
pub struct TokenGuard {
    _permit: tokio::sync::OwnedSemaphorePermit, // keeps the token until drop
}
