//! Storage Adapter: the single seam through which every other crate talks
//! to the embedded relational file. Owns connection lifecycle, pragmas, and
//! transaction scoping; knows nothing about clinical semantics.

pub mod adapter;
pub mod error;

pub use adapter::{CommandOutcome, Storage};
pub use error::{Result, StorageError};
