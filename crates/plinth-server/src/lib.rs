//! Development server for plinth.
//!
//! Serves the build output, injects a live-reload client into HTML pages and
//! watches the source tree to re-run affected tasks.

pub mod reload;
pub mod server;
pub mod watcher;

pub use reload::{ReloadHub, ReloadMessage};
pub use server::{DevServer, DevServerConfig, ServerError};
pub use watcher::{watch, SourceWatcher, WatchBinding};
