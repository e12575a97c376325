//! In-process reader. Whatever holds the [`ScanFeed`] plays the part of the
//! hardware; dropping every feed disconnects the reader.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{scanned, NfcError, NfcEvent, NfcReader, EVENT_BUFFER};

/// Sending half of a [`ChannelReader`].
#[derive(Debug, Clone)]
pub struct ScanFeed {
    tx: mpsc::Sender<String>,
}

impl ScanFeed {
    /// Presents a card. Returns `false` once the reader has gone away.
    pub async fn scan(&self, raw_uid: impl Into<String>) -> bool {
        self.tx.send(raw_uid.into()).await.is_ok()
    }
}

#[derive(Debug)]
pub struct ChannelReader {
    feed: Option<mpsc::Receiver<String>>,
    connected: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ChannelReader {
    pub fn new() -> (Self, ScanFeed) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let reader = ChannelReader {
            feed: Some(rx),
            connected: Arc::new(AtomicBool::new(false)),
            task: None,
        };
        (reader, ScanFeed { tx })
    }
}

impl NfcReader for ChannelReader {
    fn connect(&mut self) -> Result<mpsc::Receiver<NfcEvent>, NfcError> {
        if self.is_connected() {
            return Err(NfcError::AlreadyConnected);
        }
        let mut feed = self.feed.take().ok_or(NfcError::SourceClosed)?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let connected = Arc::clone(&self.connected);

        connected.store(true, Ordering::SeqCst);
        self.task = Some(tokio::spawn(async move {
            if tx.send(NfcEvent::Connected).await.is_ok() {
                while let Some(raw) = feed.recv().await {
                    if tx.send(scanned(&raw)).await.is_err() {
                        break;
                    }
                }
            }
            connected.store(false, Ordering::SeqCst);
            let _ = tx.send(NfcEvent::Disconnected).await;
        }));

        Ok(rx)
    }

    fn disconnect(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for ChannelReader {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
