//! Terminal session controller
//!
//! Owns one line buffer, one history and one connection. Key events flow
//! through the dispatcher into the editor and history; committed commands go
//! out over the transport. Incoming frames are decoded, deduplicated and
//! appended to the scrollback.
//!
//! Transport failures never touch buffer state beyond adding an error line.

use std::fmt;

use super::buffer::{AppendOutcome, CursorMove, LineBuffer, LineKind, ScrollListener};
use super::style::StyleResolver;
use crate::config::AppConfig;
use crate::error::{ConfigResult, TransportError, TransportResult};
use crate::history::HistoryNavigator;
use crate::keybind::{Action, InputDispatcher, InputEvent};
use crate::transport::{
    generate_session_id, validate_command, CloseOutcome, ConnectionState,
    ConnectionStateMachine, FrameDeduplicator, Incoming, Outgoing, ReconnectPolicy, Transport,
    CLOSE_NORMAL,
};

/// Shown when the connection drops and will not come back on its own
pub const CONNECTION_LOST: &str = "Connection lost. Please refresh to reconnect.";

/// Shown once reconnect attempts run out
pub const RECONNECT_EXHAUSTED: &str = "Maximum reconnection attempts reached";

pub struct TerminalSession<T: Transport> {
    id: String,
    buffer: LineBuffer,
    history: HistoryNavigator,
    dispatcher: InputDispatcher,
    connection: ConnectionStateMachine,
    dedup: FrameDeduplicator,
    transport: T,
    resolver: StyleResolver,
    prompt: Option<String>,
    title: Option<String>,
    bells: usize,
}

impl<T: Transport> fmt::Debug for TerminalSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalSession")
            .field("id", &self.id)
            .field("buffer", &self.buffer)
            .field("history", &self.history.len())
            .field("connection", &self.connection.state())
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> TerminalSession<T> {
    /// Session with built-in defaults
    pub fn new(transport: T) -> Self {
        Self {
            id: generate_session_id(),
            buffer: LineBuffer::new(),
            history: HistoryNavigator::default(),
            dispatcher: InputDispatcher::new(),
            connection: ConnectionStateMachine::new(ReconnectPolicy::default()),
            dedup: FrameDeduplicator::new(),
            transport,
            resolver: StyleResolver::default(),
            prompt: None,
            title: None,
            bells: 0,
        }
    }

    /// Session sized and themed from `config`
    pub fn from_config(transport: T, config: &AppConfig) -> ConfigResult<Self> {
        let mut session = Self::new(transport);
        session.buffer = LineBuffer::with_limits(
            config.terminal.max_output_lines,
            config.terminal.scroll_threshold_px,
        );
        session.history = HistoryNavigator::new(config.history.max_size);
        session.connection = ConnectionStateMachine::new(config.transport.reconnect_policy());
        session.resolver =
            StyleResolver::new(config.appearance.palette()?, config.appearance.theme()?);
        session.prompt = config.terminal.prompt.clone();
        Ok(session)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    pub fn history(&self) -> &HistoryNavigator {
        &self.history
    }

    pub fn resolver(&self) -> &StyleResolver {
        &self.resolver
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Last window title announced by the shell
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Bells rung since the session started
    pub fn bells(&self) -> usize {
        self.bells
    }

    pub fn set_scroll_listener(&mut self, listener: ScrollListener) {
        self.buffer.set_scroll_listener(listener);
    }

    /// Forward a viewport scroll event
    pub fn handle_scroll(&mut self, scroll_top: f64, scroll_height: f64, client_height: f64) {
        self.buffer
            .handle_scroll(scroll_top, scroll_height, client_height);
    }

    /// Jump the viewport back to the newest output
    pub fn scroll_to_bottom(&mut self) {
        self.buffer.scroll_to_bottom();
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Dispatch and apply one input event, returning the action taken.
    ///
    /// `Action::Copy` carries the text the host should put on the clipboard.
    pub fn handle_input(&mut self, event: &InputEvent) -> Action {
        let action = self.dispatcher.dispatch(event);
        self.apply(&action);
        action
    }

    pub fn apply(&mut self, action: &Action) {
        match action {
            Action::InsertText(text) => {
                self.buffer.insert_at_cursor(text);
                self.history.reset();
            }
            Action::MoveCursor(movement) => self.buffer.move_cursor(*movement, 1),
            Action::Delete(direction) => {
                self.buffer.delete_at_cursor(*direction);
                self.history.reset();
            }
            Action::Submit => self.submit(),
            Action::HistoryUp => {
                let draft = self.buffer.input().text().to_string();
                if let Some(recalled) = self.history.navigate_up(&draft) {
                    let recalled = recalled.to_string();
                    self.buffer.update_current_line(&recalled);
                }
            }
            Action::HistoryDown => {
                if let Some(recalled) = self.history.navigate_down() {
                    let recalled = recalled.to_string();
                    self.buffer.update_current_line(&recalled);
                }
            }
            Action::Interrupt => self.interrupt(),
            Action::ClearScreen => self.clear_screen(),
            Action::Copy(_) | Action::None => {}
        }
    }

    /// Commit the input line and send it
    pub fn submit(&mut self) {
        let command = self.buffer.commit();
        self.history.reset();
        if command.is_empty() {
            return;
        }

        self.history.record(&command);
        if !validate_command(&command) {
            tracing::warn!(len = command.len(), "Rejected invalid command");
            self.push_error("Error: Invalid command");
            return;
        }
        if let Err(e) = self.send(Outgoing::input(command)) {
            self.report_send_error(&e);
        }
    }

    /// Send Ctrl+C and drop the current line
    pub fn interrupt(&mut self) {
        if let Err(e) = self.send(Outgoing::interrupt()) {
            self.report_send_error(&e);
        }
        self.buffer.clear_input();
        self.history.reset();
    }

    pub fn clear_screen(&mut self) {
        self.buffer.clear_screen();
        if let Some(prompt) = self.prompt.clone() {
            self.buffer.add_prompt(&prompt);
        }
    }

    /// Move the cursor by more than one step (mouse click placement)
    pub fn move_cursor(&mut self, movement: CursorMove, amount: usize) {
        self.buffer.move_cursor(movement, amount);
    }

    fn send(&mut self, frame: Outgoing) -> TransportResult<()> {
        self.connection.ensure_connected()?;
        self.transport.send(frame.encode()?)
    }

    fn report_send_error(&mut self, error: &TransportError) {
        tracing::warn!(%error, "Failed to send");
        self.push_error(&format!("Error: {error}"));
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    /// Feed one raw frame from the shell
    pub fn receive_frame(&mut self, frame: &str) -> Option<AppendOutcome> {
        match self.dedup.accept(frame) {
            Ok(Some(incoming)) => self.receive(incoming),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Undecodable frame");
                Some(self.push_error(&format!("Error: {e}")))
            }
        }
    }

    /// Apply an already decoded frame
    pub fn receive(&mut self, incoming: Incoming) -> Option<AppendOutcome> {
        match incoming {
            Incoming::Output(data) => {
                if data.trim().is_empty() {
                    return None;
                }
                let outcome = self.buffer.append_output(&data, LineKind::Output);
                self.bells += outcome.bells;
                if let Some(title) = &outcome.title {
                    self.title = Some(title.clone());
                }
                Some(outcome)
            }
            Incoming::Error(message) => Some(self.push_error(&format!("Error: {message}"))),
        }
    }

    /// Begin connecting; `false` when already connecting or failed
    pub fn connect(&mut self) -> bool {
        self.connection.connect()
    }

    pub fn connection_opened(&mut self) {
        self.connection.on_open();
        self.dedup.reset();
    }

    /// The socket closed. The caller schedules a reconnect on
    /// [`CloseOutcome::Reconnect`].
    pub fn connection_closed(&mut self, code: u16) -> CloseOutcome {
        let outcome = self.connection.on_close(code);
        match outcome {
            CloseOutcome::Reconnect { attempt, delay } => {
                let max = self.connection.policy().max_attempts;
                self.push_error(&format!(
                    "Connection lost. Reconnecting in {}s (attempt {attempt}/{max})",
                    delay.as_secs()
                ));
            }
            CloseOutcome::Exhausted { .. } => {
                self.push_error(&format!("Error: {RECONNECT_EXHAUSTED}"));
            }
            CloseOutcome::Closed if code != CLOSE_NORMAL => {
                self.push_error(CONNECTION_LOST);
            }
            CloseOutcome::Closed => {}
        }
        outcome
    }

    /// Socket-level error; a close event is expected to follow
    pub fn connection_error(&mut self, message: &str) {
        tracing::warn!(message, "Connection error");
        self.push_error(&format!("Error: {message}"));
    }

    /// Backoff delay elapsed; `true` when the caller should reconnect
    pub fn retry_elapsed(&mut self) -> bool {
        self.connection.on_retry_elapsed()
    }

    /// User-requested reconnect after failure
    pub fn retry(&mut self) {
        self.connection.retry();
    }

    pub fn disconnect(&mut self) {
        self.connection.disconnect();
    }

    fn push_error(&mut self, message: &str) -> AppendOutcome {
        self.buffer.append_message(message, LineKind::Error)
    }
}
