//! chatdeck library root.

pub mod cli;
pub mod config;
pub mod console;
pub mod directory;
pub mod error;
pub mod logging;
pub mod session;
pub mod telegram;

pub use cli::Commands;
pub use config::{load_settings, Settings};
pub use console::{Console, Dispatcher, OutputRouter, OutputSink};
pub use directory::{Contact, Directory, Recipient, Room, TargetKind};
pub use error::{Error, Result};
pub use session::{Orchestrator, Session, SessionEvent};
