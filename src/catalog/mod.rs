// src/catalog/mod.rs

//! The entry catalog and the scanner that builds it.

pub mod model;
pub mod scanner;

pub use model::{Catalog, CatalogEntry, EntryId, Thumbnail};
pub use scanner::{Scanner, PLACEHOLDER_ID};
