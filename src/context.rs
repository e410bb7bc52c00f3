//! Execution-context validity
//!
//! A browser extension reload or update orphans every page script that is
//! still running. Each context carries an [`ExtensionContext`] flag; once it
//! is invalidated every storage and messaging call fails fast instead of
//! touching the page.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ExtensionContext {
    id: Uuid,
    invalidated: Arc<AtomicBool>,
}

impl ExtensionContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            invalidated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Unique id of this context, used to drop self-originated broadcasts
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_valid(&self) -> bool {
        !self.invalidated.load(Ordering::Acquire)
    }

    /// Mark the context as orphaned. Irreversible.
    pub fn invalidate(&self) {
        if !self.invalidated.swap(true, Ordering::AcqRel) {
            tracing::debug!(context = %self.id, "Extension context invalidated");
        }
    }
}

impl Default for ExtensionContext {
    fn default() -> Self {
        Self::new()
    }
}
