//! noted-versions: encrypted version chains for notes
//!
//! - `engine`: snapshot-or-diff decision for each edit
//! - `chain`: chain collection and tolerant replay
//! - `store`: append-only version storage (memory and JSON file)
//! - `vault`: per-note sealing and reconstruction

pub mod chain;
pub mod engine;
pub mod error;
pub mod store;
pub mod vault;

pub use chain::{build_content, collect_chain, ChainWarning, Reconstruction};
pub use engine::{
    initial_version, record_edit, restore_version, should_snapshot, VersionWriteRequest,
    SNAPSHOT_INTERVAL,
};
pub use error::{Result, VersionError};
pub use store::{JsonStore, MemoryVersionStore, VersionStore};
pub use vault::NoteVault;

/// Seconds since the Unix epoch, as stamped on versions, notes and tombstones.
pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
