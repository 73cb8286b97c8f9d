//! Version, note and account persistence
//!
//! Two backends are available:
//!   - **Memory**: a plain vector, used by tests and as the in-memory half of
//!     the JSON store.
//!   - **JSON**: one document holding accounts, notes and versions, loaded
//!     entirely into memory and flushed atomically via temp+rename.
//!
//! Stores only ever see sealed payloads and wrapped keys.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use noted_core::{AccountKeys, DeletedNote, NoteRecord, VersionRecord};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VersionError};
use crate::now_secs;

/// Append-only version storage.
pub trait VersionStore {
    /// Add a version. Rejects a duplicate id, and any version number that is
    /// not above the note's current latest.
    fn append(&mut self, version: VersionRecord) -> Result<()>;

    fn get(&self, id: &str) -> Result<Option<VersionRecord>>;

    /// Highest-numbered version of a note.
    fn latest(&self, note_id: &str) -> Result<Option<VersionRecord>>;

    /// All versions of a note, newest first.
    fn list(&self, note_id: &str) -> Result<Vec<VersionRecord>>;

    fn by_number(&self, note_id: &str, version_number: u64) -> Result<Option<VersionRecord>> {
        Ok(self
            .list(note_id)?
            .into_iter()
            .find(|v| v.version_number() == version_number))
    }

    /// The version `id` plus the versions of the same note numbered up to
    /// `depth` below it, so a chain walk needs a single fetch. Backends with
    /// a cheaper batch query should override this.
    fn ancestor_window(&self, id: &str, depth: usize) -> Result<Vec<VersionRecord>> {
        let Some(target) = self.get(id)? else {
            return Ok(Vec::new());
        };
        let top = target.version_number();
        let bottom = top.saturating_sub(depth as u64);
        Ok(self
            .list(&target.note_id)?
            .into_iter()
            .filter(|v| (bottom..=top).contains(&v.version_number()))
            .collect())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryVersionStore {
    versions: Vec<VersionRecord>,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Drop every version of a note. Returns how many were removed.
    pub fn remove_note(&mut self, note_id: &str) -> usize {
        let before = self.versions.len();
        self.versions.retain(|v| v.note_id != note_id);
        before - self.versions.len()
    }

    fn latest_ref(&self, note_id: &str) -> Option<&VersionRecord> {
        self.versions
            .iter()
            .filter(|v| v.note_id == note_id)
            .max_by_key(|v| v.version_number())
    }
}

impl VersionStore for MemoryVersionStore {
    fn append(&mut self, version: VersionRecord) -> Result<()> {
        if self.versions.iter().any(|v| v.id == version.id) {
            return Err(VersionError::Conflict(format!(
                "version id {} already exists",
                version.id
            )));
        }
        if let Some(latest) = self.latest_ref(&version.note_id) {
            if version.version_number() <= latest.version_number() {
                return Err(VersionError::Conflict(format!(
                    "note {} is already at version {}, cannot append version {}",
                    version.note_id,
                    latest.version_number(),
                    version.version_number()
                )));
            }
        }
        self.versions.push(version);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<VersionRecord>> {
        Ok(self.versions.iter().find(|v| v.id == id).cloned())
    }

    fn latest(&self, note_id: &str) -> Result<Option<VersionRecord>> {
        Ok(self.latest_ref(note_id).cloned())
    }

    fn list(&self, note_id: &str) -> Result<Vec<VersionRecord>> {
        let mut versions: Vec<VersionRecord> = self
            .versions
            .iter()
            .filter(|v| v.note_id == note_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.version_number().cmp(&a.version_number()));
        Ok(versions)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    accounts: BTreeMap<String, AccountKeys>,
    #[serde(default)]
    notes: BTreeMap<String, NoteRecord>,
    #[serde(default)]
    versions: MemoryVersionStore,
    #[serde(default)]
    deleted: Vec<DeletedNote>,
}

/// Accounts, notes and versions in a single JSON file.
pub struct JsonStore {
    path: PathBuf,
    doc: StoreDocument,
    dirty: bool,
}

fn account_key(account_id: &str) -> String {
    account_id.to_lowercase()
}

impl JsonStore {
    /// Load the store at `path`, or start empty if the file does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        let doc = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                VersionError::Storage(format!("reading store {}: {e}", path.display()))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                VersionError::Storage(format!("parsing store {}: {e}", path.display()))
            })?
        } else {
            StoreDocument::default()
        };

        Ok(JsonStore {
            path: path.to_path_buf(),
            doc,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn account(&self, account_id: &str) -> Option<&AccountKeys> {
        self.doc.accounts.get(&account_key(account_id))
    }

    /// Store account key material, replacing any previous value (re-key).
    pub fn put_account(&mut self, account_id: &str, keys: AccountKeys) {
        self.doc.accounts.insert(account_key(account_id), keys);
        self.dirty = true;
    }

    pub fn note(&self, note_id: &str) -> Option<&NoteRecord> {
        self.doc.notes.get(note_id)
    }

    pub fn insert_note(&mut self, note: NoteRecord) -> Result<()> {
        if self.doc.notes.contains_key(&note.id) {
            return Err(VersionError::Conflict(format!(
                "note {} already exists",
                note.id
            )));
        }
        self.doc.notes.insert(note.id.clone(), note);
        self.dirty = true;
        Ok(())
    }

    /// Update a note's plaintext title and tags.
    pub fn update_note_meta(&mut self, note_id: &str, title: &str, tags: &[String]) -> Result<()> {
        let note = self
            .doc
            .notes
            .get_mut(note_id)
            .ok_or_else(|| VersionError::NotFound(format!("note {note_id}")))?;
        note.title = title.to_string();
        note.tags = tags.to_vec();
        self.dirty = true;
        Ok(())
    }

    /// Notes owned by an account, oldest first.
    pub fn notes_for(&self, account_id: &str) -> Vec<&NoteRecord> {
        let owner = account_key(account_id);
        let mut notes: Vec<&NoteRecord> = self
            .doc
            .notes
            .values()
            .filter(|n| account_key(&n.account_id) == owner)
            .collect();
        notes.sort_by_key(|n| n.created_at);
        notes
    }

    /// Notes owned by an account carrying `tag` (case-insensitive), oldest first.
    pub fn notes_tagged(&self, account_id: &str, tag: &str) -> Vec<&NoteRecord> {
        self.notes_for(account_id)
            .into_iter()
            .filter(|n| n.has_tag(tag))
            .collect()
    }

    /// Remove a note and its whole history, leaving a tombstone.
    pub fn delete_note(&mut self, note_id: &str) -> Result<DeletedNote> {
        let note = self
            .doc
            .notes
            .remove(note_id)
            .ok_or_else(|| VersionError::NotFound(format!("note {note_id}")))?;
        let removed = self.doc.versions.remove_note(note_id);

        let tombstone = DeletedNote {
            note_id: note.id,
            account_id: note.account_id,
            tags: note.tags,
            deleted_at: now_secs(),
        };
        self.doc.deleted.push(tombstone.clone());
        self.dirty = true;

        tracing::info!(note_id, versions = removed, "note deleted");
        Ok(tombstone)
    }

    /// Tombstones for an account, newest first.
    pub fn deleted_for(&self, account_id: &str) -> Vec<&DeletedNote> {
        let owner = account_key(account_id);
        let mut deleted: Vec<&DeletedNote> = self
            .doc
            .deleted
            .iter()
            .filter(|d| account_key(&d.account_id) == owner)
            .collect();
        deleted.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        deleted
    }

    /// Flush dirty changes to disk using an atomic write (write then rename).
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VersionError::Storage(format!("creating store dir {}: {e}", parent.display()))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.doc)
            .map_err(|e| VersionError::Storage(format!("serializing store: {e}")))?;

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, json).map_err(|e| {
            VersionError::Storage(format!("writing store temp {}: {e}", tmp_path.display()))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            VersionError::Storage(format!("renaming store {}: {e}", self.path.display()))
        })?;

        tracing::debug!(path = %self.path.display(), "store flushed");
        self.dirty = false;
        Ok(())
    }
}

impl VersionStore for JsonStore {
    fn append(&mut self, version: VersionRecord) -> Result<()> {
        self.doc.versions.append(version)?;
        self.dirty = true;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<VersionRecord>> {
        self.doc.versions.get(id)
    }

    fn latest(&self, note_id: &str) -> Result<Option<VersionRecord>> {
        self.doc.versions.latest(note_id)
    }

    fn list(&self, note_id: &str) -> Result<Vec<VersionRecord>> {
        self.doc.versions.list(note_id)
    }
}

impl Drop for JsonStore {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(e) = self.flush() {
                tracing::warn!("failed to flush store on drop: {e}");
            }
        }
    }
}
