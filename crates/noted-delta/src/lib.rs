//! noted-delta: character-level text diff and its compact delta encoding
//!
//! # Overview
//! - `diff`: Myers diff over Unicode scalar values, normalised into
//!   `Equal` / `Delete` / `Insert` runs
//! - `codec`: the TAB-separated delta wire format and its replay
//!
//! ```text
//! "hello world" -> "hello wonderful world"
//! delta: "=6\t+wonderful \t=5"
//! ```

pub mod codec;
pub mod diff;
pub mod error;

pub use codec::{apply, decode, delta, encode};
pub use diff::{diff, source_text, target_text, Op};
pub use error::{DeltaError, Result};
