//! Foundation types for Strata.
//!
//! Every other Strata crate depends on `strata-types` for the identifier that
//! names objects in the content-addressed store.
//!
//! # Key Types
//!
//! - [`ObjectId`] — Content digest (BLAKE3) naming blobs and trees
//! - [`TypeError`] — Parse failures for identifiers

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::{ObjectId, OBJECT_ID_LEN, SHORT_HEX_LEN};
