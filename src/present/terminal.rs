// src/present/terminal.rs

//! Text-mode presentation used by the `kiosk` binary.
//!
//! Frames are printed to stdout when they change, input is read line by
//! line from stdin, and sounds are only logged. Logs go to stderr so the two
//! streams stay separate.

use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::present::assets::SoundHandle;
use crate::present::{AudioSink, Frame, InputEvent, InputSource, RenderSink};

/// Map one line of operator input to an event.
pub fn parse_key(line: &str) -> Option<InputEvent> {
    match line.trim().to_lowercase().as_str() {
        "w" | "up" => Some(InputEvent::Up),
        "s" | "down" => Some(InputEvent::Down),
        "a" | "left" => Some(InputEvent::Left),
        "d" | "right" => Some(InputEvent::Right),
        "" | "enter" | "e" => Some(InputEvent::Confirm),
        "esc" | "b" | "back" => Some(InputEvent::Cancel),
        "q" | "quit" => Some(InputEvent::Quit),
        _ => None,
    }
}

/// Prints the text layers of each new frame.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    last: Option<Frame>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderSink for TerminalRenderer {
    fn present(&mut self, frame: &Frame) {
        if self.last.as_ref() == Some(frame) {
            return;
        }
        let mut out = io::stdout().lock();
        let mut write = || -> io::Result<()> {
            writeln!(out, "----------------------------------------")?;
            for text in frame.texts() {
                writeln!(out, "{text}")?;
            }
            out.flush()
        };
        if let Err(err) = write() {
            warn!(error = %err, "could not write frame");
        }
        self.last = Some(frame.clone());
    }
}

/// Reads operator commands from stdin on a background task.
#[derive(Debug)]
pub struct StdinInput {
    rx: mpsc::UnboundedReceiver<InputEvent>,
    reader: JoinHandle<()>,
}

impl StdinInput {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match parse_key(&line) {
                        Some(event) => {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                        None => debug!(input = %line, "unrecognized input"),
                    },
                    Ok(None) => {
                        info!("stdin closed; quitting");
                        let _ = tx.send(InputEvent::Quit);
                        break;
                    }
                    Err(err) => {
                        warn!(error = %err, "stdin read failed");
                        break;
                    }
                }
            }
        });
        Self { rx, reader }
    }
}

impl InputSource for StdinInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Drop for StdinInput {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Audio sink that records playback in the log only.
#[derive(Debug, Default)]
pub struct LogAudio;

impl AudioSink for LogAudio {
    fn play(&mut self, sound: &SoundHandle) {
        info!(sound = ?sound.path, "play");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_events() {
        assert_eq!(parse_key("w"), Some(InputEvent::Up));
        assert_eq!(parse_key(" D "), Some(InputEvent::Right));
        assert_eq!(parse_key(""), Some(InputEvent::Confirm));
        assert_eq!(parse_key("esc"), Some(InputEvent::Cancel));
        assert_eq!(parse_key("q"), Some(InputEvent::Quit));
        assert_eq!(parse_key("jump"), None);
    }
}
