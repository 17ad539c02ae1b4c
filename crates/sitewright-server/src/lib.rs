//! Development server for sitewright.
//!
//! Serves the development output with a live-reload script injected into
//! every page, and re-runs asset tasks when sources change.

pub mod reload;
pub mod server;
pub mod watch;
pub mod watcher;

pub use reload::{ReloadHub, ReloadMessage};
pub use server::{DevServer, DevServerConfig, ServerError};
pub use watch::{classify, WatchCategory, WatchLoop};
pub use watcher::FileWatcher;
