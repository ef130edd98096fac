//! Scrollback line buffer and single-line input editor
//!
//! Output chunks go through the escape-sequence parser with the style carried
//! over from the previous chunk. The result becomes one [`ScrollbackLine`] per
//! newline-separated piece. A screen clear in a chunk replaces the scrollback
//! with whatever follows it.
//!
//! The buffer holds at most `max_lines` lines and evicts the oldest first.
//! Line identifiers only ever grow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use unicode_width::UnicodeWidthStr;

use super::parser::{self, ControlCommand, Segment, StyleState};
use super::style::StyleResolver;

/// Maximum scrollback lines retained
pub const MAX_OUTPUT_LINES: usize = 10_000;

/// Distance from the bottom (in pixels) still treated as "at bottom"
pub const SCROLL_THRESHOLD_PX: f64 = 10.0;

/// Opaque, monotonically increasing line identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineId(u64);

impl LineId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Output,
    Input,
    Prompt,
    Error,
}

impl LineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Output => "output",
            Self::Input => "input",
            Self::Prompt => "prompt",
            Self::Error => "error",
        }
    }
}

/// One rendered scrollback line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollbackLine {
    pub id: LineId,
    /// Styled runs, never containing empty text
    pub segments: Vec<Segment>,
    pub kind: LineKind,
    pub created_at: DateTime<Utc>,
}

impl ScrollbackLine {
    /// Plain text of the line
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.segments.iter().all(|s| s.text.trim().is_empty())
    }

    /// HTML `div` with one `span` per styled segment
    pub fn to_html(&self, resolver: &StyleResolver) -> String {
        let mut html = format!(
            "<div id=\"{}\" class=\"terminal-line {}\">",
            self.id,
            self.kind.as_str()
        );
        for segment in &self.segments {
            let css = resolver.resolve(&segment.style).to_css();
            if css.is_empty() {
                html.push_str(&escape_html(&segment.text));
            } else {
                html.push_str(&format!(
                    "<span class=\"{}\" style=\"{}\">{}</span>",
                    segment.style.css_classes(),
                    css,
                    escape_html(&segment.text)
                ));
            }
        }
        html.push_str("</div>");
        html
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDirection {
    Backward,
    Forward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    Left,
    Right,
    Home,
    End,
}

/// The line being composed, with the cursor as a character offset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputLine {
    text: String,
    cursor: usize,
}

/// Input line split around the cursor for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorSplit {
    pub before: String,
    /// Character under the cursor, a space at end of line
    pub at: String,
    pub after: String,
}

impl InputLine {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cursor offset in characters, always within `0..=len()`
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Display column of the cursor, counting wide characters as two
    pub fn cursor_column(&self) -> usize {
        self.text[..self.byte_index(self.cursor)].width()
    }

    pub fn split_at_cursor(&self) -> CursorSplit {
        let start = self.byte_index(self.cursor);
        let mut rest = self.text[start..].chars();
        let at = rest.next().map_or_else(|| " ".to_string(), String::from);
        CursorSplit {
            before: self.text[..start].to_string(),
            at,
            after: rest.collect(),
        }
    }

    fn byte_index(&self, offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(offset)
            .map_or(self.text.len(), |(i, _)| i)
    }

    fn insert(&mut self, text: &str) {
        let at = self.byte_index(self.cursor);
        self.text.insert_str(at, text);
        self.cursor += text.chars().count();
    }

    fn delete(&mut self, direction: DeleteDirection) {
        match direction {
            DeleteDirection::Backward => {
                if self.cursor == 0 {
                    return;
                }
                self.cursor -= 1;
                let at = self.byte_index(self.cursor);
                self.text.remove(at);
            }
            DeleteDirection::Forward => {
                if self.cursor >= self.len() {
                    return;
                }
                let at = self.byte_index(self.cursor);
                self.text.remove(at);
            }
        }
    }

    fn move_cursor(&mut self, movement: CursorMove, amount: usize) {
        let len = self.len();
        self.cursor = match movement {
            CursorMove::Left => self.cursor.saturating_sub(amount),
            CursorMove::Right => self.cursor.saturating_add(amount).min(len),
            CursorMove::Home => 0,
            CursorMove::End => len,
        };
    }

    fn replace(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.len();
    }

    fn reset(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }
}

/// Scroll position reported to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollState {
    pub position: f64,
    pub at_bottom: bool,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            position: 0.0,
            at_bottom: true,
        }
    }
}

/// Notification delivered to the scroll listener
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollNotice {
    /// Position or at-bottom flag changed
    Changed(ScrollState),
    /// New lines arrived while at the bottom; the view should follow them
    FollowOutput,
}

pub type ScrollListener = Box<dyn FnMut(ScrollNotice) + Send>;

/// What an append did to the buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    pub lines_added: usize,
    pub evicted: usize,
    /// The chunk contained a whole-screen clear
    pub cleared: bool,
    pub bells: usize,
    pub title: Option<String>,
}

/// Scrollback plus the current input line
pub struct LineBuffer {
    lines: VecDeque<ScrollbackLine>,
    input: InputLine,
    style: StyleState,
    next_id: u64,
    scroll: ScrollState,
    max_lines: usize,
    scroll_threshold: f64,
    listener: Option<ScrollListener>,
}

impl fmt::Debug for LineBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineBuffer")
            .field("lines", &self.lines.len())
            .field("input", &self.input)
            .field("style", &self.style)
            .field("next_id", &self.next_id)
            .field("scroll", &self.scroll)
            .field("max_lines", &self.max_lines)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::with_limits(MAX_OUTPUT_LINES, SCROLL_THRESHOLD_PX)
    }

    /// `max_lines` of 0 is treated as 1
    pub fn with_limits(max_lines: usize, scroll_threshold: f64) -> Self {
        Self {
            lines: VecDeque::new(),
            input: InputLine::default(),
            style: StyleState::default(),
            next_id: 0,
            scroll: ScrollState::default(),
            max_lines: max_lines.max(1),
            scroll_threshold,
            listener: None,
        }
    }

    /// Register the callback that receives scroll notifications
    pub fn set_scroll_listener(&mut self, listener: ScrollListener) {
        self.listener = Some(listener);
    }

    pub fn lines(&self) -> impl DoubleEndedIterator<Item = &ScrollbackLine> + ExactSizeIterator {
        self.lines.iter()
    }

    pub fn get(&self, index: usize) -> Option<&ScrollbackLine> {
        self.lines.get(index)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    pub fn input(&self) -> &InputLine {
        &self.input
    }

    /// Style carried into the next output chunk
    pub fn style(&self) -> StyleState {
        self.style
    }

    pub fn scroll_state(&self) -> ScrollState {
        self.scroll
    }

    /// Parse `text` and append the resulting lines as `kind`
    pub fn append_output(&mut self, text: &str, kind: LineKind) -> AppendOutcome {
        let parsed = parser::parse(text, self.style);
        self.style = parsed.final_style;
        self.append_parsed(parsed, kind)
    }

    /// Append a locally generated message (errors, notices).
    ///
    /// Parsed from the default style; the style carried between output chunks
    /// is left alone.
    pub fn append_message(&mut self, text: &str, kind: LineKind) -> AppendOutcome {
        let parsed = parser::parse(text, StyleState::default());
        self.append_parsed(parsed, kind)
    }

    fn append_parsed(&mut self, parsed: parser::ParseOutput, kind: LineKind) -> AppendOutcome {
        let mut outcome = AppendOutcome {
            bells: parsed
                .commands()
                .filter(|c| *c == ControlCommand::Bell)
                .count(),
            title: parsed.title.clone(),
            ..Default::default()
        };

        let clear_offset = parsed.last_clear().map(|c| c.offset);
        let segments = match clear_offset {
            Some(offset) => {
                tracing::debug!(dropped = self.lines.len(), "Screen cleared by output");
                self.lines.clear();
                outcome.cleared = true;
                let rest = segments_after(&parsed.segments, offset);
                if rest.iter().all(|s| s.text.trim().is_empty()) {
                    Vec::new()
                } else {
                    rest
                }
            }
            None => parsed.segments,
        };

        let created_at = Utc::now();
        for line in split_lines(segments) {
            let id = self.allocate_id();
            self.lines.push_back(ScrollbackLine {
                id,
                segments: line,
                kind,
                created_at,
            });
            outcome.lines_added += 1;
        }

        outcome.evicted = self.evict();

        if outcome.lines_added > 0 && self.scroll.at_bottom {
            self.notify(ScrollNotice::FollowOutput);
        }
        outcome
    }

    /// Append a prompt line, skipped when `text` is blank
    pub fn add_prompt(&mut self, text: &str) -> AppendOutcome {
        if text.trim().is_empty() {
            return AppendOutcome::default();
        }
        self.append_output(text, LineKind::Prompt)
    }

    pub fn insert_at_cursor(&mut self, text: &str) {
        self.input.insert(text);
    }

    pub fn delete_at_cursor(&mut self, direction: DeleteDirection) {
        self.input.delete(direction);
    }

    pub fn move_cursor(&mut self, movement: CursorMove, amount: usize) {
        self.input.move_cursor(movement, amount);
    }

    /// Replace the input text and put the cursor at its end
    pub fn update_current_line(&mut self, text: &str) {
        self.input.replace(text);
    }

    /// Reset the input line without touching the scrollback
    pub fn clear_input(&mut self) {
        self.input.reset();
    }

    /// Drop all scrollback and reset the input line and scroll tracking
    pub fn clear_screen(&mut self) {
        self.lines.clear();
        self.input.reset();
        self.scroll = ScrollState::default();
        self.notify(ScrollNotice::Changed(self.scroll));
    }

    /// Take the trimmed input text, resetting the input line
    pub fn commit(&mut self) -> String {
        let text = self.input.text.trim().to_string();
        self.input.reset();
        text
    }

    /// Record a scroll event from the viewport
    pub fn handle_scroll(&mut self, scroll_top: f64, scroll_height: f64, client_height: f64) {
        let at_bottom = scroll_height - scroll_top - client_height < self.scroll_threshold;
        let next = ScrollState {
            position: scroll_top,
            at_bottom,
        };
        if next != self.scroll {
            self.scroll = next;
            self.notify(ScrollNotice::Changed(next));
        }
    }

    /// Pin the view to the bottom and ask the host to follow output
    pub fn scroll_to_bottom(&mut self) {
        if !self.scroll.at_bottom {
            self.scroll.at_bottom = true;
            self.notify(ScrollNotice::Changed(self.scroll));
        }
        self.notify(ScrollNotice::FollowOutput);
    }

    fn allocate_id(&mut self) -> LineId {
        let id = LineId(self.next_id);
        self.next_id += 1;
        id
    }

    fn evict(&mut self) -> usize {
        let excess = self.lines.len().saturating_sub(self.max_lines);
        if excess > 0 {
            self.lines.drain(..excess);
            tracing::debug!(evicted = excess, max = self.max_lines, "Evicted scrollback lines");
        }
        excess
    }

    fn notify(&mut self, notice: ScrollNotice) {
        if let Some(listener) = self.listener.as_mut() {
            listener(notice);
        }
    }
}

/// Segments covering the text from byte `offset` onwards
fn segments_after(segments: &[Segment], offset: usize) -> Vec<Segment> {
    let mut pos = 0;
    let mut out = Vec::new();
    for segment in segments {
        let end = pos + segment.text.len();
        if end > offset {
            let start = offset.saturating_sub(pos);
            out.push(Segment::new(&segment.text[start..], segment.style));
        }
        pos = end;
    }
    out
}

/// Split styled segments on `\n`, dropping a trailing empty line
fn split_lines(segments: Vec<Segment>) -> Vec<Vec<Segment>> {
    let mut lines = Vec::new();
    let mut current: Vec<Segment> = Vec::new();
    let mut current_empty = true;

    for segment in segments {
        let mut pieces = segment.text.split('\n').peekable();
        while let Some(piece) = pieces.next() {
            if !piece.is_empty() {
                current.push(Segment::new(piece, segment.style));
                current_empty = false;
            }
            if pieces.peek().is_some() {
                lines.push(std::mem::take(&mut current));
                current_empty = true;
            }
        }
    }

    if !current_empty {
        lines.push(current);
    }
    lines
}
