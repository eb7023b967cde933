//! Collection listing: folder scan plus dimension probing.

pub mod file_scanner;
pub mod metadata;

pub use file_scanner::{ListConfig, ListingError, MediaLister};
