use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use medstock_inventory::{MovementDraft, StockMovement};

use super::r#trait::{LedgerStore, StoreError, StoredRow, StoredRows};

/// In-memory ledger mirror.
///
/// Intended for tests/dev. Saves can be made to fail on demand to exercise the
/// "appended but not persisted" path.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    movements: RwLock<Vec<StockMovement>>,
    fail_saves: AtomicBool,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `movements` already persisted.
    pub fn with_movements(movements: Vec<StockMovement>) -> Self {
        Self {
            movements: RwLock::new(movements),
            fail_saves: AtomicBool::new(false),
        }
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// What the last successful save wrote.
    pub fn saved(&self) -> Result<Vec<StockMovement>, StoreError> {
        self.movements
            .read()
            .map(|m| m.clone())
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn load(&self) -> Result<StoredRows, StoreError> {
        let movements = self
            .movements
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let rows = movements
            .iter()
            .enumerate()
            .map(|(idx, m)| StoredRow {
                line: idx as u64 + 1,
                id: m.id,
                draft: MovementDraft::from(m),
            })
            .collect();

        Ok(StoredRows {
            rows,
            errors: Vec::new(),
        })
    }

    fn save(&self, movements: &[StockMovement]) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("saves disabled".to_string()));
        }
        let mut stored = self
            .movements
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        *stored = movements.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn poisoned_lock_is_reported() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.movements.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(matches!(store.saved(), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.load(), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.save(&[]), Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn save_replaces_contents_unless_disabled() {
        let store = InMemoryLedgerStore::new();
        store.save(&[]).unwrap();
        assert!(store.saved().unwrap().is_empty());

        store.set_fail_saves(true);
        assert!(store.save(&[]).is_err());
    }
}
