//! # Earshot Virtual Filesystem (earshot-fs)
//!
//! Serialized access to an on-disk tree for persisted player state.
//!
//! **Purpose:** Give callers value-like [`Directory`] handles and registry-backed
//! [`File`] handles, and funnel every structural and content operation through a
//! single [`FileSystem`] coordination point so concurrent tasks never interleave
//! conflicting reads and writes.
//!
//! **Architecture:**
//! - [`Directory`]: (anchor, relative path) value; no I/O until used
//! - [`File`]: obtained only through [`FileSystem::file`]; at most one live handle
//!   per resolved path, deregistered when the last clone is dropped
//! - [`StorageBackend`]: the real storage ([`LocalBackend`] uses `tokio::fs`)
//!
//! Running two `FileSystem` instances over the same tree is unsupported, as is
//! mutating the tree outside the engine.

pub mod backend;
pub mod directory;
pub mod engine;
pub mod error;
pub mod handle;

pub use backend::{DirEntry, EntryMetadata, LocalBackend, StorageBackend};
pub use directory::{sanitize_name, Anchor, BaseAnchor, Directory};
pub use engine::FileSystem;
pub use error::{FsError, Result};
pub use handle::File;
