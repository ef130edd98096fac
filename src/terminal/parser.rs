//! ANSI Escape Sequence Parser
//!
//! Uses vte to turn a text chunk into styled segments plus the cursor and
//! screen control commands found in it.
//!
//! The parser holds no state between calls. The running [`StyleState`] is
//! passed in and handed back in [`ParseOutput::final_style`], so any number of
//! independent streams can be parsed side by side.
//!
//! A chunk that ends in the middle of an escape sequence keeps the unfinished
//! bytes as literal text instead of dropping them.

use serde::{Deserialize, Serialize};
use vte::{Params, Parser, Perform};

use crate::color::{AnsiColor, ColorRef, Rgb};

/// Number of spaces a horizontal tab expands to
pub const TAB_WIDTH: usize = 4;

const ESC: u8 = 0x1b;

/// Text attributes in effect while text is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StyleState {
    pub foreground: Option<ColorRef>,
    pub background: Option<ColorRef>,
    pub bold: bool,
    pub dim: bool,
    pub italic: bool,
    pub underline: bool,
    pub reverse: bool,
    pub strikethrough: bool,
}

impl StyleState {
    /// Whether every attribute is at its default
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Apply a flat list of SGR codes (`ESC [ 1;31 m` → `[1, 31]`)
    pub fn apply_codes(&mut self, codes: &[u16]) {
        self.apply_sgr(codes.iter().map(std::slice::from_ref));
    }

    /// Apply SGR parameter groups in order.
    ///
    /// Each group is one `;`-separated parameter with its `:` sub-parameters.
    /// Unknown codes are ignored.
    pub fn apply_sgr<'a, I>(&mut self, params: I)
    where
        I: IntoIterator<Item = &'a [u16]>,
    {
        let mut iter = params.into_iter();

        while let Some(param) = iter.next() {
            let Some(&value) = param.first() else {
                continue;
            };
            match value {
                0 => *self = Self::default(),
                1 => self.bold = true,
                2 => self.dim = true,
                3 => self.italic = true,
                4 => self.underline = true,
                7 => self.reverse = true,
                9 => self.strikethrough = true,
                21 | 22 => {
                    self.bold = false;
                    self.dim = false;
                }
                23 => self.italic = false,
                24 => self.underline = false,
                27 => self.reverse = false,
                29 => self.strikethrough = false,
                30..=37 => self.foreground = ansi(value - 30),
                38 => {
                    if let Some(color) = extended_color(param, &mut iter) {
                        self.foreground = Some(color);
                    }
                }
                39 => self.foreground = None,
                40..=47 => self.background = ansi(value - 40),
                48 => {
                    if let Some(color) = extended_color(param, &mut iter) {
                        self.background = Some(color);
                    }
                }
                49 => self.background = None,
                90..=97 => self.foreground = ansi(value - 90 + 8),
                100..=107 => self.background = ansi(value - 100 + 8),
                _ => {}
            }
        }
    }
}

fn ansi(index: u16) -> Option<ColorRef> {
    u8::try_from(index)
        .ok()
        .and_then(AnsiColor::from_index)
        .map(ColorRef::Ansi)
}

/// Decode the color following a 38/48 code, from either its `:` sub-parameters
/// or the next `;` parameters.
fn extended_color<'a, I>(param: &[u16], rest: &mut I) -> Option<ColorRef>
where
    I: Iterator<Item = &'a [u16]>,
{
    let colon_form = param.len() > 1;
    let mut sub = param.iter().skip(1).copied();
    let mut next = || {
        if colon_form {
            sub.next()
        } else {
            rest.next().and_then(|p| p.first().copied())
        }
    };
    let byte = |v: u16| v.min(255) as u8;

    match next()? {
        5 => next().map(|idx| ColorRef::Indexed(byte(idx))),
        2 => {
            let r = next()?;
            let g = next()?;
            let b = next()?;
            Some(ColorRef::Rgb(Rgb::new(byte(r), byte(g), byte(b))))
        }
        _ => None,
    }
}

/// A run of text sharing one style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub style: StyleState,
}

impl Segment {
    pub fn new(text: impl Into<String>, style: StyleState) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Non-text instruction extracted from the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlCommand {
    /// 1-based row/column
    CursorPosition { row: u16, col: u16 },
    CursorUp { count: u16 },
    CursorDown { count: u16 },
    CursorForward { count: u16 },
    CursorBackward { count: u16 },
    ClearToEnd,
    ClearToBeginning,
    ClearScreen,
    ClearAll,
    Bell,
}

impl ControlCommand {
    /// Whether this command wipes the whole visible screen
    pub fn clears_screen(&self) -> bool {
        matches!(self, Self::ClearScreen | Self::ClearAll)
    }
}

/// A control command and where it occurred in the cleaned text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub command: ControlCommand,
    /// Byte offset into the concatenated segment text at which the command
    /// was encountered
    pub offset: usize,
}

/// Result of parsing one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutput {
    pub segments: Vec<Segment>,
    /// Controls in stream order
    pub controls: Vec<Control>,
    pub final_style: StyleState,
    /// Last window title set by `OSC 0` / `OSC 2`
    pub title: Option<String>,
}

impl ParseOutput {
    /// Concatenated text of every segment
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// Control commands in stream order, without offsets
    pub fn commands(&self) -> impl Iterator<Item = ControlCommand> + '_ {
        self.controls.iter().map(|c| c.command)
    }

    /// The last screen clear in the chunk, if any
    pub fn last_clear(&self) -> Option<&Control> {
        self.controls.iter().rev().find(|c| c.command.clears_screen())
    }
}

/// Parse `chunk`, starting from `prior` style.
///
/// Text between SGR sequences becomes one segment carrying the style in effect
/// while it was written. The text after the last SGR sequence is always
/// emitted, even when empty, so a chunk without SGR sequences yields exactly
/// one segment with `prior` unchanged.
pub fn parse(chunk: &str, prior: StyleState) -> ParseOutput {
    let mut parser = Parser::new();
    let mut collector = Collector::new(prior);

    for (index, byte) in chunk.bytes().enumerate() {
        if byte == ESC && collector.pending.is_none() {
            collector.pending = Some(PendingSequence {
                start: index,
                text_mark: collector.current.len(),
                controls_mark: collector.controls.len(),
            });
        }
        parser.advance(&mut collector, byte);
    }

    if let Some(pending) = collector.pending.take() {
        if in_ground_state(&mut parser) {
            // Finished but ignored by vte (malformed CSI), nothing to keep
            tracing::trace!("Dropping ignored escape sequence at chunk end");
            return collector.finish();
        }
        let tail = &chunk[pending.start..];
        tracing::debug!(
            len = tail.len(),
            "Unterminated escape sequence at chunk end, keeping as literal text"
        );
        collector.current.truncate(pending.text_mark);
        collector.controls.truncate(pending.controls_mark);
        collector.current.push_str(&normalize_literal(tail));
    }

    collector.finish()
}

/// Remove every escape sequence, returning the cleaned text
pub fn strip_ansi(text: &str) -> String {
    parse(text, StyleState::default()).text()
}

/// Whether `text` contains at least one complete escape sequence
pub fn has_ansi_sequences(text: &str) -> bool {
    let mut parser = Parser::new();
    let mut detector = Detector::default();
    for byte in text.bytes() {
        parser.advance(&mut detector, byte);
        if detector.found {
            return true;
        }
    }
    false
}

/// Whether the last sequence fed to `parser` ran to completion.
///
/// Consumes `parser`'s state: only a parser in the ground state prints the
/// byte it is given, every other state swallows it as part of a sequence.
fn in_ground_state(parser: &mut Parser) -> bool {
    let mut check = GroundCheck::default();
    parser.advance(&mut check, b'A');
    check.printed
}

/// Apply carriage-return and tab normalization to literal text
fn normalize_literal(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\t', &" ".repeat(TAB_WIDTH))
}

/// Where an escape sequence started, for rewinding if it never finishes
#[derive(Debug, Clone, Copy)]
struct PendingSequence {
    start: usize,
    text_mark: usize,
    controls_mark: usize,
}

/// vte performer collecting segments and controls for a single chunk
struct Collector {
    style: StyleState,
    /// Text written since the last flushed segment
    current: String,
    segments: Vec<Segment>,
    /// Bytes of text already flushed into `segments`
    flushed: usize,
    controls: Vec<Control>,
    title: Option<String>,
    /// Previous byte was CR, so a following LF is already accounted for
    after_cr: bool,
    pending: Option<PendingSequence>,
}

impl Collector {
    fn new(style: StyleState) -> Self {
        Self {
            style,
            current: String::new(),
            segments: Vec::new(),
            flushed: 0,
            controls: Vec::new(),
            title: None,
            after_cr: false,
            pending: None,
        }
    }

    fn offset(&self) -> usize {
        self.flushed + self.current.len()
    }

    fn push_control(&mut self, command: ControlCommand) {
        tracing::trace!(?command, "Parsed control command");
        let offset = self.offset();
        self.controls.push(Control { command, offset });
    }

    /// Close the text run written under the current style
    fn flush_segment(&mut self) {
        if !self.current.is_empty() {
            let text = std::mem::take(&mut self.current);
            self.flushed += text.len();
            self.segments.push(Segment::new(text, self.style));
        }
    }

    /// A sequence ran to completion
    fn settle(&mut self) {
        self.pending = None;
        self.after_cr = false;
    }

    fn finish(mut self) -> ParseOutput {
        let text = std::mem::take(&mut self.current);
        self.segments.push(Segment::new(text, self.style));
        ParseOutput {
            segments: self.segments,
            controls: self.controls,
            final_style: self.style,
            title: self.title,
        }
    }

    fn handle_csi(&mut self, params: &Params, action: char) {
        let first = params.iter().next().and_then(|p| p.first().copied());
        let count = first.unwrap_or(1).max(1);

        match action {
            'H' | 'f' => {
                let mut iter = params.iter();
                let row = iter.next().and_then(|p| p.first().copied()).unwrap_or(1);
                let col = iter.next().and_then(|p| p.first().copied()).unwrap_or(1);
                self.push_control(ControlCommand::CursorPosition {
                    row: row.max(1),
                    col: col.max(1),
                });
            }
            'A' => self.push_control(ControlCommand::CursorUp { count }),
            'B' => self.push_control(ControlCommand::CursorDown { count }),
            'C' => self.push_control(ControlCommand::CursorForward { count }),
            'D' => self.push_control(ControlCommand::CursorBackward { count }),
            'J' => match first.unwrap_or(0) {
                0 => self.push_control(ControlCommand::ClearToEnd),
                1 => self.push_control(ControlCommand::ClearToBeginning),
                2 => self.push_control(ControlCommand::ClearScreen),
                3 => self.push_control(ControlCommand::ClearAll),
                mode => tracing::trace!(mode, "Ignoring unknown erase-in-display mode"),
            },
            'm' => {
                self.flush_segment();
                self.style.apply_sgr(params.iter());
            }
            // Bracketed paste markers (200~ / 201~) and other function keys
            '~' => {}
            _ => tracing::trace!(%action, "Dropping unsupported CSI sequence"),
        }
    }
}

impl Perform for Collector {
    fn print(&mut self, c: char) {
        self.settle();
        self.current.push(c);
    }

    fn execute(&mut self, byte: u8) {
        let after_cr = std::mem::replace(&mut self.after_cr, false);
        match byte {
            // Bell
            0x07 => self.push_control(ControlCommand::Bell),
            // Horizontal Tab
            0x09 => {
                for _ in 0..TAB_WIDTH {
                    self.current.push(' ');
                }
            }
            // Line Feed
            0x0A => {
                if !after_cr {
                    self.current.push('\n');
                }
            }
            // Carriage Return
            0x0D => {
                self.current.push('\n');
                self.after_cr = true;
            }
            // Backspace, NUL, shift-in/out and the rest are content to the host
            other => self.current.push(char::from(other)),
        }
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {}

    fn put(&mut self, _byte: u8) {}

    fn unhook(&mut self) {
        self.settle();
    }

    fn osc_dispatch(&mut self, params: &[&[u8]], _bell_terminated: bool) {
        self.settle();
        // Window title; every other OSC (cwd, hyperlinks, clipboard) is dropped
        if let [b"0" | b"2", rest @ ..] = params {
            if !rest.is_empty() {
                let title = rest
                    .iter()
                    .map(|p| String::from_utf8_lossy(p))
                    .collect::<Vec<_>>()
                    .join(";");
                self.title = Some(title);
            }
        }
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], ignore: bool, action: char) {
        self.settle();
        if ignore || !intermediates.is_empty() {
            // Private modes (`?25h`, `?2004h`) and malformed sequences
            return;
        }
        self.handle_csi(params, action);
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {
        self.settle();
    }
}

/// Performer that only records whether a character was printed
#[derive(Default)]
struct GroundCheck {
    printed: bool,
}

impl Perform for GroundCheck {
    fn print(&mut self, _c: char) {
        self.printed = true;
    }
}

/// Performer that only records whether any sequence completed
#[derive(Default)]
struct Detector {
    found: bool,
}

impl Perform for Detector {
    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {
        self.found = true;
    }

    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {
        self.found = true;
    }

    fn csi_dispatch(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {
        self.found = true;
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {
        self.found = true;
    }
}
