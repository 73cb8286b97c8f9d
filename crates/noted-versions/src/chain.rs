//! Read side of the version chain: gather a chain and replay it
//!
//! Replay is tolerant. A broken link stops accumulation and is reported as a
//! warning for that version and every later one, and the caller still gets
//! the best text reached. Such a result is provisional and must not be used
//! as the base of a new diff.

use std::collections::{HashMap, HashSet};
use std::fmt;

use noted_core::VersionRecord;

use crate::engine::SNAPSHOT_INTERVAL;
use crate::error::{Result, VersionError};
use crate::store::VersionStore;

/// A version that could not be applied during replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainWarning {
    pub version_id: String,
    pub version_number: u64,
    pub reason: String,
}

impl fmt::Display for ChainWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chain reconstruction failed at version {} ({}): {}",
            self.version_number, self.version_id, self.reason
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconstruction {
    pub content: String,
    pub warnings: Vec<ChainWarning>,
}

impl Reconstruction {
    /// True when every version in the chain was applied.
    pub fn is_authoritative(&self) -> bool {
        self.warnings.is_empty()
    }
}

fn warning(version: &VersionRecord, reason: impl Into<String>) -> ChainWarning {
    ChainWarning {
        version_id: version.id.clone(),
        version_number: version.version_number(),
        reason: reason.into(),
    }
}

/// Replay `chain` (oldest first, starting at a snapshot) into plaintext.
///
/// `open` decrypts one version's payload. Never fails and never panics; all
/// problems come back as warnings.
pub fn build_content<F>(chain: &[VersionRecord], mut open: F) -> Reconstruction
where
    F: FnMut(&VersionRecord) -> Result<String>,
{
    let Some((first, rest)) = chain.split_first() else {
        return Reconstruction {
            content: String::new(),
            warnings: vec![ChainWarning {
                version_id: String::new(),
                version_number: 0,
                reason: "empty chain".into(),
            }],
        };
    };

    let mut content = if first.is_snapshot() {
        match open(first) {
            Ok(text) => text,
            Err(e) => {
                let r = Reconstruction {
                    content: String::new(),
                    warnings: fail_from(chain, 0, &e.to_string()),
                };
                log_warnings(&r);
                return r;
            }
        }
    } else {
        let r = Reconstruction {
            content: String::new(),
            warnings: vec![warning(first, "chain does not start with a snapshot")],
        };
        log_warnings(&r);
        return r;
    };

    for (offset, version) in rest.iter().enumerate() {
        let step = if version.is_snapshot() {
            Err(VersionError::ChainReconstructionFailed(
                "snapshot in the middle of a chain".into(),
            ))
        } else {
            open(version).and_then(|delta| {
                noted_delta::apply(&content, &delta).map_err(VersionError::from)
            })
        };

        match step {
            Ok(next) => content = next,
            Err(e) => {
                let r = Reconstruction {
                    content,
                    warnings: fail_from(chain, offset + 1, &e.to_string()),
                };
                log_warnings(&r);
                return r;
            }
        }
    }

    tracing::debug!(versions = chain.len(), "chain replayed");
    Reconstruction {
        content,
        warnings: Vec::new(),
    }
}

/// Warnings for `chain[at]` (with `reason`) and every version after it.
fn fail_from(chain: &[VersionRecord], at: usize, reason: &str) -> Vec<ChainWarning> {
    let Some(failed) = chain.get(at) else {
        return Vec::new();
    };
    std::iter::once(warning(failed, reason))
        .chain(chain[at + 1..].iter().map(|v| {
            warning(
                v,
                format!("not applied: version {} failed", failed.version_number()),
            )
        }))
        .collect()
}

fn log_warnings(reconstruction: &Reconstruction) {
    for w in &reconstruction.warnings {
        tracing::warn!(
            version_id = %w.version_id,
            version = w.version_number,
            reason = %w.reason,
            "chain reconstruction failed"
        );
    }
}

/// Fetch the chain ending at `version_id`: the nearest snapshot followed by
/// every diff up to and including the target, oldest first.
pub fn collect_chain<S: VersionStore + ?Sized>(
    store: &S,
    version_id: &str,
) -> Result<Vec<VersionRecord>> {
    let window: HashMap<String, VersionRecord> = store
        .ancestor_window(version_id, SNAPSHOT_INTERVAL as usize)?
        .into_iter()
        .map(|v| (v.id.clone(), v))
        .collect();

    let fetch = |id: &str| -> Result<Option<VersionRecord>> {
        match window.get(id) {
            Some(v) => Ok(Some(v.clone())),
            None => store.get(id),
        }
    };

    let target = fetch(version_id)?
        .ok_or_else(|| VersionError::NotFound(format!("version {version_id}")))?;
    let note_id = target.note_id.clone();

    let mut seen = HashSet::new();
    let mut chain = Vec::new();
    let mut current = target;

    loop {
        if !seen.insert(current.id.clone()) {
            return Err(VersionError::ChainReconstructionFailed(format!(
                "cycle at version {}",
                current.id
            )));
        }
        if current.is_snapshot() {
            chain.push(current);
            break;
        }
        if chain.len() as u64 >= SNAPSHOT_INTERVAL {
            return Err(VersionError::ChainReconstructionFailed(format!(
                "no snapshot within {SNAPSHOT_INTERVAL} versions of {version_id}"
            )));
        }

        let base_id = current.base_version_id.clone().ok_or_else(|| {
            VersionError::ChainReconstructionFailed(format!(
                "diff {} has no base version",
                current.id
            ))
        })?;
        let base = fetch(&base_id)?.ok_or_else(|| {
            VersionError::ChainReconstructionFailed(format!(
                "base {base_id} of {} is missing",
                current.id
            ))
        })?;
        if base.note_id != note_id {
            return Err(VersionError::ChainReconstructionFailed(format!(
                "base {base_id} belongs to another note"
            )));
        }

        chain.push(current);
        current = base;
    }

    chain.reverse();
    tracing::debug!(
        version_id,
        length = chain.len(),
        from = chain.first().map(|v| v.version_number()),
        "chain collected"
    );
    Ok(chain)
}
