//! Content-addressed object storage for Strata.
//!
//! Blobs hold file bytes and trees hold directory listings. Both are stored
//! as immutable objects keyed by a domain-separated BLAKE3 digest, so a
//! tree snapshot can be shared freely between readers.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file content
//! - [`Tree`] -- sorted directory listing of [`TreeEntry`] values
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//!
//! Concurrent reads are always safe; the diff layer only ever reads.

pub mod error;
pub mod hasher;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use hasher::ContentHasher;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, EntryMode, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::ObjectStore;
