//! # NFC Reader Abstraction
//!
//! Connect, disconnect and a stream of scan events. Drivers run a background
//! task and hand events over an `mpsc` channel; the station loop consumes
//! them one at a time.
//!
//! ```text
//! ┌──────────────┐  connect()   ┌──────────────────────────────────────────┐
//! │ station loop │─────────────►│ reader task                              │
//! │              │◄─────────────│  Connected                               │
//! │              │◄─────────────│  TagScanned { uid: "04A1B2C3", at }      │
//! │              │◄─────────────│  Error("Unreadable tag ...")             │
//! │              │◄─────────────│  Disconnected                            │
//! └──────────────┘              └──────────────────────────────────────────┘
//! ```
//!
//! - [`LineReader`] - USB readers in keyboard mode, one UID per line
//! - [`ChannelReader`] - fed in-process (tests, other drivers)

mod channel;
mod line;

pub use channel::{ChannelReader, ScanFeed};
pub use line::LineReader;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

use kiosk_core::validation::normalize_nfc_uid;

/// Buffered events between a reader task and its consumer.
pub const EVENT_BUFFER: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum NfcEvent {
    Connected,
    /// A card was presented. `uid` is normalized uppercase hex.
    TagScanned { uid: String, at: DateTime<Utc> },
    Disconnected,
    /// Unreadable input or a driver fault; the reader keeps going.
    Error { message: String },
}

#[derive(Debug, Error)]
pub enum NfcError {
    #[error("Reader is already connected")]
    AlreadyConnected,

    /// The reader's input was consumed by an earlier connection.
    #[error("Reader input is no longer available")]
    SourceClosed,
}

/// A card reader.
///
/// `connect` must be called inside a tokio runtime: it spawns the task that
/// produces events.
pub trait NfcReader: Send {
    fn connect(&mut self) -> Result<mpsc::Receiver<NfcEvent>, NfcError>;

    /// Stops the reader task. The receiver sees the channel close.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;
}

/// Turns raw reader input into a scan or an error event.
pub(crate) fn scanned(raw: &str) -> NfcEvent {
    match normalize_nfc_uid(raw) {
        Ok(uid) => NfcEvent::TagScanned { uid, at: Utc::now() },
        Err(e) => NfcEvent::Error {
            message: format!("Unreadable tag '{}': {}", raw.trim(), e),
        },
    }
}

/// Drops repeats of the same tag inside a time window.
///
/// A card left on the reader, or presented twice in a hurry, must not check
/// the patron in and straight back out.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last: Option<(String, Instant)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer { window, last: None }
    }

    /// Whether a scan of `uid` at `now` should go through.
    pub fn accept(&mut self, uid: &str, now: Instant) -> bool {
        if let Some((last_uid, at)) = &self.last {
            if last_uid == uid && now.saturating_duration_since(*at) < self.window {
                return false;
            }
        }
        self.last = Some((uid.to_string(), now));
        true
    }
}
