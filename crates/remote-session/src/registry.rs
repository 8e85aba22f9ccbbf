//! Registry of cancellable streaming operations, keyed by operation id.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Live streaming operations that can be cancelled by id.
///
/// Registering an id that is already present replaces the entry; the
/// earlier stream keeps running but can no longer be cancelled by id.
#[derive(Debug, Default)]
pub struct ActiveTransfers {
    next_generation: AtomicU64,
    entries: Mutex<HashMap<String, (u64, CancellationToken)>>,
}

impl ActiveTransfers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `operation_id`. The entry is removed when the returned
    /// guard drops.
    pub fn register(&self, operation_id: &str) -> TransferRegistration<'_> {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.entries
            .lock()
            .unwrap()
            .insert(operation_id.to_string(), (generation, token.clone()));
        TransferRegistration {
            registry: self,
            operation_id: operation_id.to_string(),
            generation,
            token,
        }
    }

    /// Cancels and forgets `operation_id`. Returns whether it was live.
    pub fn cancel(&self, operation_id: &str) -> bool {
        let removed = self.entries.lock().unwrap().remove(operation_id);
        match removed {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, operation_id: &str) -> bool {
        self.entries.lock().unwrap().contains_key(operation_id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, operation_id: &str, generation: u64) {
        let mut entries = self.entries.lock().unwrap();
        if entries
            .get(operation_id)
            .is_some_and(|(g, _)| *g == generation)
        {
            entries.remove(operation_id);
        }
    }
}

/// Keeps an operation registered for as long as it lives.
pub struct TransferRegistration<'a> {
    registry: &'a ActiveTransfers,
    operation_id: String,
    generation: u64,
    token: CancellationToken,
}

impl TransferRegistration<'_> {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for TransferRegistration<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.operation_id, self.generation);
    }
}
