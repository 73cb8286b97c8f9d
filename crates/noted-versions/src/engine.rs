//! Write side of the version chain: decides what a new version stores
//!
//! Version 1 is always a snapshot. After that, every version whose
//! predecessor's number is a multiple of [`SNAPSHOT_INTERVAL`] is a snapshot
//! too (11, 21, ...), so a read never replays more than nine deltas.

use noted_core::{VersionMetadata, VersionRecord, VersionType};

pub const SNAPSHOT_INTERVAL: u64 = 10;

/// Whether the version following `latest_version_number` stores full text.
pub fn should_snapshot(latest_version_number: u64) -> bool {
    latest_version_number % SNAPSHOT_INTERVAL == 0
}

/// Plaintext version about to be sealed and appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionWriteRequest {
    pub note_id: String,
    pub version_type: VersionType,
    /// Full text for a snapshot, encoded delta for a diff
    pub payload: String,
    pub base_version_id: Option<String>,
    pub metadata: VersionMetadata,
}

impl VersionWriteRequest {
    pub fn version_number(&self) -> u64 {
        self.metadata.version_number
    }
}

fn metadata(title: &str, tags: &[String], version_number: u64) -> VersionMetadata {
    VersionMetadata {
        title: title.to_string(),
        tags: tags.to_vec(),
        version_number,
    }
}

/// The snapshot written when a note is created.
pub fn initial_version(
    note_id: &str,
    plaintext: &str,
    title: &str,
    tags: &[String],
) -> VersionWriteRequest {
    VersionWriteRequest {
        note_id: note_id.to_string(),
        version_type: VersionType::Snapshot,
        payload: plaintext.to_string(),
        base_version_id: None,
        metadata: metadata(title, tags, 1),
    }
}

/// Turn an edit into the next version, or `None` if the text is unchanged.
///
/// `prior` must be the reconstructed plaintext of `latest`.
pub fn record_edit(
    note_id: &str,
    prior: &str,
    new: &str,
    latest: &VersionRecord,
    title: &str,
    tags: &[String],
) -> Option<VersionWriteRequest> {
    if prior == new {
        return None;
    }

    let latest_number = latest.version_number();
    let next = latest_number + 1;

    if should_snapshot(latest_number) {
        tracing::debug!(note_id, version = next, "writing snapshot");
        return Some(VersionWriteRequest {
            note_id: note_id.to_string(),
            version_type: VersionType::Snapshot,
            payload: new.to_string(),
            base_version_id: None,
            metadata: metadata(title, tags, next),
        });
    }

    let payload = noted_delta::delta(prior, new);
    tracing::debug!(
        note_id,
        version = next,
        base = %latest.id,
        delta_len = payload.len(),
        "writing diff"
    );
    Some(VersionWriteRequest {
        note_id: note_id.to_string(),
        version_type: VersionType::Diff,
        payload,
        base_version_id: Some(latest.id.clone()),
        metadata: metadata(title, tags, next),
    })
}

/// Write `plaintext` (typically an older version's content) as a new snapshot
/// on top of `latest`. History is never rewritten.
pub fn restore_version(
    note_id: &str,
    plaintext: &str,
    latest: &VersionRecord,
    title: &str,
    tags: &[String],
) -> VersionWriteRequest {
    VersionWriteRequest {
        note_id: note_id.to_string(),
        version_type: VersionType::Snapshot,
        payload: plaintext.to_string(),
        base_version_id: None,
        metadata: metadata(title, tags, latest.version_number() + 1),
    }
}
