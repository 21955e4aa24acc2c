// In-memory victim store

use crate::error::{DispatchError, Result};
use crate::models::{DispatchSnapshot, StatusPatch};
use crate::store::VictimStore;
use parking_lot::Mutex;

/// Holds a snapshot in memory and applies patches to it
pub struct MemoryStore {
    state: Mutex<DispatchSnapshot>,
    patches: Mutex<Vec<StatusPatch>>,
}

impl MemoryStore {
    pub fn new(snapshot: DispatchSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
            patches: Mutex::new(Vec::new()),
        }
    }

    /// Patches received so far, oldest first
    pub fn patches(&self) -> Vec<StatusPatch> {
        self.patches.lock().clone()
    }
}

impl VictimStore for MemoryStore {
    fn snapshot(&self) -> Result<DispatchSnapshot> {
        Ok(self.state.lock().clone())
    }

    fn patch_status(&self, patch: &StatusPatch) -> Result<()> {
        {
            let mut state = self.state.lock();
            let victim = state
                .victims
                .iter_mut()
                .find(|v| v.id == patch.victim_id)
                .ok_or_else(|| DispatchError::Store(format!("unknown victim {}", patch.victim_id)))?;
            victim.rescue_status = patch.rescue_status;
            victim.severity = patch.emergency_status;
        }
        self.patches.lock().push(patch.clone());
        Ok(())
    }
}
