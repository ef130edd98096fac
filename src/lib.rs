//! WebTerm Library
//!
//! Terminal emulation engine for a browser-hosted shell:
//! - ANSI escape sequence parsing into styled segments and control commands
//! - Scrollback line buffer and single-line input editor
//! - Command history navigation and keyboard dispatch
//! - Wire codec and reconnect state machine for the shell connection

pub mod color;
pub mod config;
pub mod error;
pub mod history;
pub mod keybind;
pub mod logging;
pub mod terminal;
pub mod transport;

pub use error::{Result, WebTermError};
