use serde::{Deserialize, Serialize};

/// AEAD output as stored: ciphertext (tag appended) plus the nonce it was sealed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sealed {
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "b64")]
    pub iv: Vec<u8>,
}

impl Sealed {
    pub fn new(ciphertext: Vec<u8>, iv: Vec<u8>) -> Self {
        Self { ciphertext, iv }
    }
}

/// Which password-hardening function produced an account's master key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "id", rename_all = "snake_case")]
pub enum KdfAlgorithm {
    /// Argon2id v0x13, 32-byte output
    Argon2idV1 {
        mem_cost_kib: u32,
        time_cost: u32,
        parallelism: u32,
    },
}

/// Per-account key material held by the account store.
///
/// Written at setup, replaced wholesale on re-key. Nothing in here is usable
/// without the master password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountKeys {
    /// Hardened proof of password knowledge; never a key
    #[serde(with = "b64")]
    pub verifier_hash: Vec<u8>,
    /// Vault key sealed under the stretched key
    #[serde(with = "b64")]
    pub wrapped_vault_key: Vec<u8>,
    #[serde(with = "b64")]
    pub wrap_iv: Vec<u8>,
    pub kdf_algorithm: KdfAlgorithm,
}

impl AccountKeys {
    pub fn wrapped_vault_key(&self) -> Sealed {
        Sealed::new(self.wrapped_vault_key.clone(), self.wrap_iv.clone())
    }
}

/// A note's content key, sealed under the session vault key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteKeys {
    #[serde(with = "b64")]
    pub wrapped_note_key: Vec<u8>,
    #[serde(with = "b64")]
    pub note_key_iv: Vec<u8>,
}

impl NoteKeys {
    pub fn sealed(&self) -> Sealed {
        Sealed::new(self.wrapped_note_key.clone(), self.note_key_iv.clone())
    }
}

impl From<Sealed> for NoteKeys {
    fn from(sealed: Sealed) -> Self {
        Self {
            wrapped_note_key: sealed.ciphertext,
            note_key_iv: sealed.iv,
        }
    }
}

/// Note entity as the note store sees it. Title and tags are plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: String,
    pub account_id: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub keys: NoteKeys,
    pub created_at: u64,
}

impl NoteRecord {
    /// Case-insensitive tag match.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.to_lowercase() == tag.to_lowercase())
    }
}

/// Tombstone left behind when a note and its history are deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedNote {
    pub note_id: String,
    pub account_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub deleted_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionType {
    /// Full note text
    Snapshot,
    /// Encoded delta against `base_version_id`
    Diff,
}

impl std::fmt::Display for VersionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionType::Snapshot => f.write_str("snapshot"),
            VersionType::Diff => f.write_str("diff"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub version_number: u64,
}

/// One immutable entry in a note's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: String,
    pub note_id: String,
    #[serde(rename = "type")]
    pub version_type: VersionType,
    #[serde(with = "b64")]
    pub encrypted_content: Vec<u8>,
    #[serde(with = "b64")]
    pub content_iv: Vec<u8>,
    pub metadata: VersionMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_version_id: Option<String>,
    pub created_at: u64,
}

impl VersionRecord {
    pub fn version_number(&self) -> u64 {
        self.metadata.version_number
    }

    pub fn is_snapshot(&self) -> bool {
        self.version_type == VersionType::Snapshot
    }

    pub fn content(&self) -> Sealed {
        Sealed::new(self.encrypted_content.clone(), self.content_iv.clone())
    }
}

/// Standard base64 for byte fields, matching what the stores hold.
pub mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
