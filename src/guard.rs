use crate::grid::RunKey;
use crate::scheduler::SchedError;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Registre des runs en cours : un seul run par (service, année, mois).
#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    active: Arc<Mutex<HashSet<RunKey>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Réserve la clé ; un second appel concurrent est rejeté.
    pub fn try_acquire(&self, key: RunKey) -> Result<RunPermit, SchedError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(key.clone()) {
            return Err(SchedError::RunInProgress(key));
        }
        debug!(%key, "run permit acquired");
        Ok(RunPermit {
            key,
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_running(&self, key: &RunKey) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// Libère la clé à la destruction.
#[derive(Debug)]
pub struct RunPermit {
    key: RunKey,
    active: Arc<Mutex<HashSet<RunKey>>>,
}

impl RunPermit {
    pub fn key(&self) -> &RunKey {
        &self.key
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Jeton d'annulation, consulté entre deux passes d'amélioration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
