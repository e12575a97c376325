//! Line-oriented reader: most USB NFC readers act as a keyboard and type the
//! UID followed by Enter. The terminal station reads them from stdin.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{scanned, Debouncer, NfcError, NfcEvent, NfcReader, EVENT_BUFFER};

pub struct LineReader<R> {
    source: Option<R>,
    debounce: Duration,
    connected: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl LineReader<BufReader<Stdin>> {
    /// Reader on the process's standard input.
    pub fn stdin(debounce: Duration) -> Self {
        LineReader::new(BufReader::new(io::stdin()), debounce)
    }
}

impl<R> LineReader<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(source: R, debounce: Duration) -> Self {
        LineReader {
            source: Some(source),
            debounce,
            connected: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }
}

impl<R> NfcReader for LineReader<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    fn connect(&mut self) -> Result<mpsc::Receiver<NfcEvent>, NfcError> {
        if self.is_connected() {
            return Err(NfcError::AlreadyConnected);
        }
        let source = self.source.take().ok_or(NfcError::SourceClosed)?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let connected = Arc::clone(&self.connected);
        let debounce = self.debounce;

        connected.store(true, Ordering::SeqCst);
        self.task = Some(tokio::spawn(async move {
            read_lines(source, debounce, &tx).await;
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

impl<R> Drop for LineReader<R> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Forwards one event per line until EOF, a read error, or the consumer
/// going away.
async fn read_lines<R>(source: R, debounce: Duration, tx: &mpsc::Sender<NfcEvent>)
where
    R: AsyncBufRead + Unpin,
{
    if tx.send(NfcEvent::Connected).await.is_err() {
        return;
    }

    let mut debouncer = Debouncer::new(debounce);
    let mut lines = source.lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "NFC reader input failed");
                let _ = tx
                    .send(NfcEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let event = scanned(&line);
        if let NfcEvent::TagScanned { uid, .. } = &event {
            if !debouncer.accept(uid, Instant::now()) {
                debug!(uid = %uid, "Repeated scan ignored");
                continue;
            }
        }

        if tx.send(event).await.is_err() {
            break;
        }
    }
}
