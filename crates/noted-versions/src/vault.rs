//! Per-note glue between the key hierarchy, the cipher and the chain engine
//!
//! A `NoteVault` holds one unwrapped note key. It seals write requests into
//! [`VersionRecord`]s and opens them again for replay; the store only ever
//! sees ciphertext.

use noted_core::{NoteKeys, NoteRecord, VersionRecord};
use noted_crypto::{
    decrypt_text, encrypt_text, generate_note_key, unwrap_note_key, wrap_note_key, NoteKey,
    VaultKey,
};

use crate::chain::{build_content, collect_chain, Reconstruction};
use crate::engine::{initial_version, record_edit, restore_version, VersionWriteRequest};
use crate::error::{Result, VersionError};
use crate::now_secs;
use crate::store::VersionStore;

#[derive(Debug)]
pub struct NoteVault {
    note_id: String,
    key: NoteKey,
}

impl NoteVault {
    /// Generate a fresh note key and wrap it under the vault key.
    pub fn create(note_id: impl Into<String>, vault_key: &VaultKey) -> Result<(Self, NoteKeys)> {
        let key = generate_note_key();
        let wrapped = wrap_note_key(&key, vault_key)?;
        Ok((
            Self {
                note_id: note_id.into(),
                key,
            },
            wrapped,
        ))
    }

    pub fn open(note: &NoteRecord, vault_key: &VaultKey) -> Result<Self> {
        let key = unwrap_note_key(&note.keys, vault_key)?;
        Ok(Self {
            note_id: note.id.clone(),
            key,
        })
    }

    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    /// Encrypt a write request's payload under the note key.
    pub fn seal(&self, request: VersionWriteRequest) -> Result<VersionRecord> {
        if request.note_id != self.note_id {
            return Err(VersionError::Conflict(format!(
                "request for note {} sealed with key of note {}",
                request.note_id, self.note_id
            )));
        }
        let sealed = encrypt_text(&request.payload, self.key.as_bytes())?;

        Ok(VersionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            note_id: request.note_id,
            version_type: request.version_type,
            encrypted_content: sealed.ciphertext,
            content_iv: sealed.iv,
            metadata: request.metadata,
            base_version_id: request.base_version_id,
            created_at: now_secs(),
        })
    }

    /// Decrypt one version's payload: full text or encoded delta.
    pub fn open_payload(&self, version: &VersionRecord) -> Result<String> {
        Ok(decrypt_text(&version.content(), self.key.as_bytes())?)
    }

    /// Seal and append a request, returning the stored record.
    fn commit<S: VersionStore + ?Sized>(
        &self,
        store: &mut S,
        request: VersionWriteRequest,
    ) -> Result<VersionRecord> {
        let record = self.seal(request)?;
        store.append(record.clone())?;
        tracing::info!(
            note_id = %self.note_id,
            version = record.version_number(),
            kind = %record.version_type,
            "version recorded"
        );
        Ok(record)
    }

    /// Write version 1 for a newly created note.
    pub fn write_initial<S: VersionStore + ?Sized>(
        &self,
        store: &mut S,
        content: &str,
        title: &str,
        tags: &[String],
    ) -> Result<VersionRecord> {
        self.commit(store, initial_version(&self.note_id, content, title, tags))
    }

    /// Replay the chain ending at `version_id`.
    pub fn reconstruct<S: VersionStore + ?Sized>(
        &self,
        store: &S,
        version_id: &str,
    ) -> Result<Reconstruction> {
        let chain = collect_chain(store, version_id)?;
        if chain.iter().any(|v| v.note_id != self.note_id) {
            return Err(VersionError::ChainReconstructionFailed(format!(
                "version {version_id} does not belong to note {}",
                self.note_id
            )));
        }
        Ok(build_content(&chain, |v| self.open_payload(v)))
    }

    pub fn reconstruct_number<S: VersionStore + ?Sized>(
        &self,
        store: &S,
        version_number: u64,
    ) -> Result<Reconstruction> {
        let version = store
            .by_number(&self.note_id, version_number)?
            .ok_or_else(|| {
                VersionError::NotFound(format!(
                    "version {version_number} of note {}",
                    self.note_id
                ))
            })?;
        self.reconstruct(store, &version.id)
    }

    fn latest<S: VersionStore + ?Sized>(&self, store: &S) -> Result<VersionRecord> {
        store
            .latest(&self.note_id)?
            .ok_or_else(|| VersionError::NotFound(format!("versions of note {}", self.note_id)))
    }

    /// The current text of the note.
    pub fn current<S: VersionStore + ?Sized>(&self, store: &S) -> Result<Reconstruction> {
        let latest = self.latest(store)?;
        self.reconstruct(store, &latest.id)
    }

    /// Record new text for the note. Returns `None` when nothing changed.
    ///
    /// If the latest version cannot be fully replayed, or its chain cannot be
    /// collected at all, the edit is written as a snapshot so the chain heals
    /// instead of stacking a diff on bad text.
    pub fn commit_edit<S: VersionStore + ?Sized>(
        &self,
        store: &mut S,
        content: &str,
        title: &str,
        tags: &[String],
    ) -> Result<Option<VersionRecord>> {
        let latest = self.latest(&*store)?;

        let request = match self.reconstruct(&*store, &latest.id) {
            Ok(prior) if prior.is_authoritative() => {
                record_edit(&self.note_id, &prior.content, content, &latest, title, tags)
            }
            Ok(prior) => {
                tracing::warn!(
                    note_id = %self.note_id,
                    warnings = prior.warnings.len(),
                    "latest version is provisional, writing a snapshot"
                );
                Some(restore_version(&self.note_id, content, &latest, title, tags))
            }
            Err(VersionError::ChainReconstructionFailed(reason)) => {
                tracing::warn!(
                    note_id = %self.note_id,
                    %reason,
                    "latest version has a broken chain, writing a snapshot"
                );
                Some(restore_version(&self.note_id, content, &latest, title, tags))
            }
            Err(e) => return Err(e),
        };

        match request {
            Some(request) => self.commit(store, request).map(Some),
            None => {
                tracing::debug!(note_id = %self.note_id, "no changes");
                Ok(None)
            }
        }
    }

    /// Write an older version's text back as a new snapshot.
    pub fn restore<S: VersionStore + ?Sized>(
        &self,
        store: &mut S,
        version_number: u64,
    ) -> Result<VersionRecord> {
        let old = self.reconstruct_number(&*store, version_number)?;
        if !old.is_authoritative() {
            return Err(VersionError::ChainReconstructionFailed(format!(
                "version {version_number} of note {} cannot be fully reconstructed",
                self.note_id
            )));
        }
        let source = store
            .by_number(&self.note_id, version_number)?
            .ok_or_else(|| VersionError::NotFound(format!("version {version_number}")))?;
        let latest = self.latest(&*store)?;

        let request = restore_version(
            &self.note_id,
            &old.content,
            &latest,
            &source.metadata.title,
            &source.metadata.tags,
        );
        self.commit(store, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryVersionStore;
    use noted_core::VersionType;
    use noted_crypto::generate_vault_key;

    fn new_note() -> (NoteVault, NoteRecord, VaultKey) {
        let vault_key = generate_vault_key();
        let (vault, keys) = NoteVault::create("n1", &vault_key).unwrap();
        let record = NoteRecord {
            id: "n1".into(),
            account_id: "alice@example.com".into(),
            title: "groceries".into(),
            tags: vec![],
            keys,
            created_at: now_secs(),
        };
        (vault, record, vault_key)
    }

    #[test]
    fn test_reopen_with_vault_key() {
        let (vault, record, vault_key) = new_note();
        let mut store = MemoryVersionStore::new();
        vault.write_initial(&mut store, "eggs", "groceries", &[]).unwrap();

        let reopened = NoteVault::open(&record, &vault_key).unwrap();
        assert_eq!(reopened.current(&store).unwrap().content, "eggs");
    }

    #[test]
    fn test_open_with_wrong_vault_key() {
        let (_, record, _) = new_note();
        let result = NoteVault::open(&record, &generate_vault_key());
        assert!(matches!(result, Err(VersionError::Crypto(_))));
    }

    #[test]
    fn test_payload_is_ciphertext() {
        let (vault, _, _) = new_note();
        let mut store = MemoryVersionStore::new();
        let v1 = vault
            .write_initial(&mut store, "top secret plan", "t", &[])
            .unwrap();

        assert_eq!(v1.content_iv.len(), 12);
        assert!(!String::from_utf8_lossy(&v1.encrypted_content).contains("secret"));
        assert_eq!(vault.open_payload(&v1).unwrap(), "top secret plan");
    }

    #[test]
    fn test_commit_edit_noop() {
        let (vault, _, _) = new_note();
        let mut store = MemoryVersionStore::new();
        vault.write_initial(&mut store, "same", "t", &[]).unwrap();

        assert!(vault
            .commit_edit(&mut store, "same", "t", &[])
            .unwrap()
            .is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_many_edits_reconstruct_every_version() {
        let (vault, _, _) = new_note();
        let mut store = MemoryVersionStore::new();
        vault.write_initial(&mut store, "", "t", &[]).unwrap();

        let mut texts = vec![String::new()];
        for i in 1..25 {
            let text = format!("{}line {i}\n", texts[i - 1]);
            vault.commit_edit(&mut store, &text, "t", &[]).unwrap();
            texts.push(text);
        }

        for (i, expected) in texts.iter().enumerate() {
            let r = vault.reconstruct_number(&store, i as u64 + 1).unwrap();
            assert!(r.is_authoritative());
            assert_eq!(&r.content, expected);
        }
        let v11 = store.by_number("n1", 11).unwrap().unwrap();
        assert_eq!(v11.version_type, VersionType::Snapshot);
    }

    #[test]
    fn test_restore_writes_snapshot() {
        let (vault, _, _) = new_note();
        let mut store = MemoryVersionStore::new();
        vault.write_initial(&mut store, "first", "t1", &[]).unwrap();
        vault.commit_edit(&mut store, "second", "t2", &[]).unwrap();

        let restored = vault.restore(&mut store, 1).unwrap();

        assert_eq!(restored.version_number(), 3);
        assert!(restored.is_snapshot());
        assert_eq!(restored.metadata.title, "t1");
        assert_eq!(vault.current(&store).unwrap().content, "first");
    }

    #[test]
    fn test_edit_on_broken_chain_heals_with_snapshot() {
        let (vault, _, _) = new_note();
        let mut store = MemoryVersionStore::new();
        vault.write_initial(&mut store, "A", "t", &[]).unwrap();

        // A diff the replay cannot apply.
        let bad = VersionWriteRequest {
            note_id: "n1".into(),
            version_type: VersionType::Diff,
            payload: "=5".into(),
            base_version_id: store.latest("n1").unwrap().map(|v| v.id),
            metadata: noted_core::VersionMetadata {
                title: "t".into(),
                tags: vec![],
                version_number: 2,
            },
        };
        store.append(vault.seal(bad).unwrap()).unwrap();
        assert!(!vault.current(&store).unwrap().is_authoritative());

        let healed = vault
            .commit_edit(&mut store, "ABC", "t", &[])
            .unwrap()
            .unwrap();
        assert!(healed.is_snapshot());
        let now = vault.current(&store).unwrap();
        assert!(now.is_authoritative());
        assert_eq!(now.content, "ABC");
    }

    #[test]
    fn test_edit_on_dangling_base_heals_with_snapshot() {
        let (vault, _, _) = new_note();
        let mut store = MemoryVersionStore::new();
        vault.write_initial(&mut store, "A", "t", &[]).unwrap();

        let orphan = VersionWriteRequest {
            note_id: "n1".into(),
            version_type: VersionType::Diff,
            payload: "=1\t+B".into(),
            base_version_id: Some("gone".into()),
            metadata: noted_core::VersionMetadata {
                title: "t".into(),
                tags: vec![],
                version_number: 2,
            },
        };
        store.append(vault.seal(orphan).unwrap()).unwrap();
        assert!(matches!(
            vault.current(&store),
            Err(VersionError::ChainReconstructionFailed(_))
        ));

        let healed = vault
            .commit_edit(&mut store, "ABC", "t", &[])
            .unwrap()
            .unwrap();
        assert!(healed.is_snapshot());
        assert_eq!(healed.version_number(), 3);
        assert!(healed.base_version_id.is_none());

        let now = vault.current(&store).unwrap();
        assert!(now.is_authoritative());
        assert_eq!(now.content, "ABC");

        // The next edit builds on the healed snapshot as a normal diff.
        let next = vault
            .commit_edit(&mut store, "ABCD", "t", &[])
            .unwrap()
            .unwrap();
        assert_eq!(next.version_type, VersionType::Diff);
        assert_eq!(vault.current(&store).unwrap().content, "ABCD");
    }

    #[test]
    fn test_seal_rejects_other_note() {
        let (vault, _, _) = new_note();
        let request = initial_version("someone-else", "x", "t", &[]);
        assert!(matches!(vault.seal(request), Err(VersionError::Conflict(_))));
    }
}
