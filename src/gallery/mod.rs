//! Headless gallery: tabs, per-tab cache and lightbox selection.

pub mod commands;
pub mod session;
pub mod state;

pub use commands::Command;
pub use session::GallerySession;
pub use state::{Action, Arranger, GalleryState, View};
