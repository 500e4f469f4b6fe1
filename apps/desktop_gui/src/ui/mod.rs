//! UI layer for the desktop GUI: app shell, screens, and layout helpers.

pub mod app;

pub use app::{DesktopGuiApp, StartupConfig};
