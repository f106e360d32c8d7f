//! Core of the Shrine downloader: a sequential download queue driving
//! the external `yt-dlp` tool, plus the config, language and log plumbing
//! the GUI in `main.rs` sits on.

pub mod activity_log;
pub mod assets;
pub mod command;
pub mod config;
pub mod dns;
pub mod downloader;
pub mod error;
pub mod i18n;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod process;
pub mod progress;
pub mod queue;
pub mod session;
pub mod system;
pub mod thumbnail;

pub use error::{Result, ShrineError};
