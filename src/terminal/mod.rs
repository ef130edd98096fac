//! Terminal emulation core
//!
//! Escape-sequence parsing, style resolution, the scrollback/input buffer and
//! the session controller that wires them to a transport.

pub mod buffer;
pub mod parser;
pub mod session;
pub mod style;

pub use buffer::{
    AppendOutcome, CursorMove, DeleteDirection, InputLine, LineBuffer, LineId, LineKind,
    ScrollNotice, ScrollState, ScrollbackLine, MAX_OUTPUT_LINES,
};
pub use parser::{parse, strip_ansi, Control, ControlCommand, ParseOutput, Segment, StyleState};
pub use session::TerminalSession;
pub use style::{resolve, StyleResolver, Theme, VisualStyle};
