//! Victim-data store boundary.
//!
//! The dispatch core reads one snapshot per cycle and writes back typed
//! status patches after the cycle completes. Writes carry no
//! read-after-write guarantee.

mod json_file;
mod memory;

pub use self::json_file::JsonFileStore;
pub use self::memory::MemoryStore;

use crate::error::Result;
use crate::models::{DispatchSnapshot, StatusPatch};

pub trait VictimStore: Send + Sync {
    /// Current victims and teams, frozen for one cycle
    fn snapshot(&self) -> Result<DispatchSnapshot>;

    fn patch_status(&self, patch: &StatusPatch) -> Result<()>;
}
