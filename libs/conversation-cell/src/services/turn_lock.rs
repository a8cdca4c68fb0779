use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// One async mutex per conversation id.
///
/// Holding the guard serializes whole turns on that conversation while other
/// conversations proceed independently. Entries live as long as the registry,
/// matching threads, which are never deleted.
#[derive(Default)]
pub struct TurnLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TurnLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key.to_string()).or_default())
        };

        if lock.try_lock().is_err() {
            debug!("Waiting for in-flight turn on thread {}", key);
        }

        lock.lock_owned().await
    }
}
