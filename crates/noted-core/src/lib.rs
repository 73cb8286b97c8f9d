//! noted-core: types shared by every noted crate
//!
//! - `types`: the stored shapes (account keys, note keys, version records)
//! - `config`: `noted.toml` schema
//! - `error`: workspace-level error type

pub mod config;
pub mod error;
pub mod types;

pub use error::{NotedError, NotedResult};
pub use types::{
    AccountKeys, DeletedNote, KdfAlgorithm, NoteKeys, NoteRecord, Sealed, VersionMetadata, VersionRecord,
    VersionType,
};
