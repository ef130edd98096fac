//! Transport boundary to the remote shell
//!
//! The terminal core never touches sockets. It hands encoded frames to a
//! [`Transport`] and is fed decoded [`Incoming`] frames plus connection
//! lifecycle events by whoever owns the socket.

pub mod connection;
pub mod message;

pub use connection::{
    CloseOutcome, ConnectionState, ConnectionStateMachine, ReconnectPolicy, CLOSE_NORMAL,
};
pub use message::{validate_command, FrameDeduplicator, Incoming, Outgoing, INTERRUPT};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{TransportError, TransportResult};

/// Outgoing half of the shell connection
pub trait Transport {
    /// Send one encoded frame
    fn send(&mut self, frame: String) -> TransportResult<()>;
}

/// Transport that forwards frames into a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    /// Create the transport and the receiver its frames arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, frame: String) -> TransportResult<()> {
        tracing::trace!(len = frame.len(), "Sending frame");
        self.tx.send(frame).map_err(|_| TransportError::Closed)
    }
}

/// New session identifier (`session_<32 hex digits>`)
pub fn generate_session_id() -> String {
    format!("session_{}", Uuid::new_v4().simple())
}

/// Connection URL for a session
pub fn connection_url(base: &str, session_id: &str) -> String {
    if session_id.is_empty() {
        base.to_string()
    } else {
        format!("{base}?session={session_id}")
    }
}
