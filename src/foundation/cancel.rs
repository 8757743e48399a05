use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Cloneable cancellation flag shared between a caller and a long-running operation.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Return [`StoryreelError::Cancelled`] once cancellation has been requested.
    pub fn check(&self) -> StoryreelResult<()> {
        if self.is_cancelled() {
            Err(StoryreelError::Cancelled)
        } else {
            Ok(())
        }
    }
}
