//! WebTerm - headless terminal replay
//!
//! Feeds a JSON-lines recording of shell frames and host input events through
//! a terminal session and prints the resulting scrollback.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use webterm::config::AppConfig;
use webterm::keybind::{InputEvent, Key, KeyModifiers};
use webterm::logging;
use webterm::terminal::TerminalSession;
use webterm::transport::{connection_url, ChannelTransport, ConnectionState, Transport};

#[derive(Parser)]
#[command(name = "webterm")]
#[command(about = "Replay recorded shell frames and key events through the terminal engine")]
#[command(version)]
struct Cli {
    /// JSON-lines recording (reads stdin when omitted)
    frames: Option<PathBuf>,

    /// Configuration file (defaults to the user/project config chain)
    #[arg(short, long, env = "WEBTERM_CONFIG")]
    config: Option<PathBuf>,

    /// How to print the scrollback
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Plain text, one line per scrollback line
    Text,
    /// HTML with styled spans
    Html,
    /// One JSON object per scrollback line
    Json,
}

/// Host-side event in a recording
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum HostEvent {
    Key {
        key: String,
        #[serde(flatten)]
        modifiers: KeyModifiers,
    },
    Paste {
        text: String,
    },
    Select {
        #[serde(default)]
        text: Option<String>,
    },
    Scroll {
        top: f64,
        height: f64,
        client: f64,
    },
    Bottom,
    Open,
    Close {
        #[serde(default = "default_close_code")]
        code: u16,
    },
    Error {
        message: String,
    },
    Retry,
}

fn default_close_code() -> u16 {
    1006
}

fn apply_event<T: Transport>(session: &mut TerminalSession<T>, event: HostEvent) {
    match event {
        HostEvent::Key { key, modifiers } => {
            let action = session.handle_input(&InputEvent::Key {
                key: Key::from_name(&key),
                modifiers,
            });
            tracing::debug!(?action, "Key event");
        }
        HostEvent::Paste { text } => {
            session.handle_input(&InputEvent::Paste(text));
        }
        HostEvent::Select { text } => {
            session.handle_input(&InputEvent::SelectionChanged(text));
        }
        HostEvent::Scroll {
            top,
            height,
            client,
        } => session.handle_scroll(top, height, client),
        HostEvent::Bottom => session.scroll_to_bottom(),
        HostEvent::Open => {
            session.connect();
            session.connection_opened();
        }
        HostEvent::Close { code } => {
            let outcome = session.connection_closed(code);
            tracing::info!(?outcome, code, "Connection closed");
        }
        HostEvent::Error { message } => session.connection_error(&message),
        HostEvent::Retry => match session.connection_state() {
            ConnectionState::Reconnecting { .. } => {
                session.retry_elapsed();
            }
            ConnectionState::Failed | ConnectionState::Disconnected => session.retry(),
            _ => {}
        },
    }
}

/// Route one recording line to the session
fn replay_line<T: Transport>(session: &mut TerminalSession<T>, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let is_host_event = serde_json::from_str::<serde_json::Value>(line)
        .map(|value| value.get("event").is_some())
        .unwrap_or(false);

    if !is_host_event {
        session.receive_frame(line);
        return;
    }

    match serde_json::from_str::<HostEvent>(line) {
        Ok(event) => apply_event(session, event),
        Err(e) => tracing::warn!(error = %e, "Skipping malformed host event"),
    }
}

fn render<T: Transport>(
    session: &TerminalSession<T>,
    format: OutputFormat,
    out: &mut impl Write,
) -> std::io::Result<()> {
    let lines = session.buffer().lines();
    match format {
        OutputFormat::Text => {
            for line in lines {
                writeln!(out, "{}", line.text())?;
            }
        }
        OutputFormat::Html => {
            writeln!(out, "<div class=\"terminal-output\">")?;
            for line in lines {
                writeln!(out, "{}", line.to_html(session.resolver()))?;
            }
            writeln!(out, "</div>")?;
        }
        OutputFormat::Json => {
            for line in lines {
                writeln!(out, "{}", serde_json::to_string(line)?)?;
            }
        }
    }
    out.flush()
}

#[tokio::main]
async fn main() -> webterm::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load()?,
    };
    let _log_guard = logging::init_logging(&config.logging);

    let (transport, mut rx) = ChannelTransport::new();
    let drain = tokio::spawn(async move {
        let mut sent = 0usize;
        while let Some(frame) = rx.recv().await {
            tracing::info!(%frame, "Frame sent");
            sent += 1;
        }
        sent
    });

    let mut session = TerminalSession::from_config(transport, &config)?;
    tracing::info!(
        session = session.id(),
        url = %connection_url(&config.transport.url, session.id()),
        "Starting replay"
    );
    session.connect();
    session.connection_opened();

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &cli.frames {
        Some(path) => Box::new(BufReader::new(tokio::fs::File::open(path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        replay_line(&mut session, &line);
    }

    let stdout = std::io::stdout();
    render(&session, cli.format, &mut stdout.lock())?;

    if let Some(title) = session.title() {
        tracing::info!(title, "Window title");
    }
    let lines = session.buffer().len();
    let bells = session.bells();
    drop(session);

    let sent = drain.await.unwrap_or_default();
    tracing::info!(lines, bells, sent, "Replay finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> TerminalSession<ChannelTransport> {
        let (transport, _rx) = ChannelTransport::new();
        let mut session = TerminalSession::new(transport);
        session.connect();
        session.connection_opened();
        session
    }

    #[test]
    fn test_host_event_parsing() {
        let event: HostEvent =
            serde_json::from_str(r#"{"event":"key","key":"c","ctrl":true}"#).unwrap();
        match event {
            HostEvent::Key { key, modifiers } => {
                assert_eq!(key, "c");
                assert!(modifiers.ctrl);
                assert!(!modifiers.shift);
            }
            other => panic!("unexpected event {other:?}"),
        }

        let event: HostEvent = serde_json::from_str(r#"{"event":"close"}"#).unwrap();
        assert!(matches!(event, HostEvent::Close { code: 1006 }));

        let event: HostEvent = serde_json::from_str(r#"{"event":"bottom"}"#).unwrap();
        assert!(matches!(event, HostEvent::Bottom));
    }

    #[test]
    fn test_replay_and_render() {
        let mut session = session();
        for line in [
            r#"{"type":"output","data":"\u001b[31mred\u001b[0m\n"}"#,
            r#"{"event":"key","key":"l"}"#,
            r#"{"event":"key","key":"s"}"#,
            "",
        ] {
            replay_line(&mut session, line);
        }
        assert_eq!(session.buffer().input().text(), "ls");

        let mut out = Vec::new();
        render(&session, OutputFormat::Text, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "red\n");

        let mut out = Vec::new();
        render(&session, OutputFormat::Html, &mut out).unwrap();
        let html = String::from_utf8(out).unwrap();
        assert!(html.contains("class=\"ansi-red\""));
        assert!(html.contains("color: #ff0000"));
    }

    #[test]
    fn test_replay_connection_events() {
        let mut session = session();
        replay_line(&mut session, r#"{"event":"close","code":1006}"#);
        assert!(matches!(
            session.connection_state(),
            ConnectionState::Reconnecting { attempt: 1 }
        ));
        replay_line(&mut session, r#"{"event":"retry"}"#);
        assert_eq!(session.connection_state(), ConnectionState::Connecting);
        replay_line(&mut session, r#"{"event":"open"}"#);
        assert_eq!(session.connection_state(), ConnectionState::Connected);
    }
}
