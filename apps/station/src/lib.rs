//! # Kiosk Station Library
//!
//! Register commands plus the loop that turns NFC scans into check-ins and
//! check-outs.
//!
//! ## Module Organization
//! ```text
//! kiosk_station/
//! ├── lib.rs          ◄─── You are here (startup & scan loop)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── cart.rs     ◄─── Counter cart
//! │   └── config.rs   ◄─── Station configuration
//! ├── commands/       ◄─── One async fn per register operation
//! ├── nfc/            ◄─── Reader trait, stdin and in-process drivers
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## State
//! Three focused state types instead of one `AppState`; each command takes
//! only what it needs.
//!
//! ```text
//! ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────────┐
//! │    DbState       │ │    CartState     │ │    ConfigState       │
//! │  • Database pool │ │  • Counter cart  │ │  • Store, terminal   │
//! │  • Repositories  │ │  • Totals        │ │  • Grace, discount   │
//! └──────────────────┘ └──────────────────┘ └──────────────────────┘
//! ```

pub mod commands;
pub mod error;
pub mod nfc;
pub mod state;

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use commands::time::{handle_scan, ScanOutcome};
use error::ApiError;
use kiosk_db::{Database, DbConfig};
use nfc::{LineReader, NfcEvent, NfcReader};
use state::{ConfigState, DbState};

/// One line written to stdout per scan.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
enum ScanReport<'a> {
    Scan {
        uid: &'a str,
        outcome: &'a ScanOutcome,
    },
    ScanFailed {
        uid: &'a str,
        error: &'a ApiError,
    },
}

/// Runs the station until the reader closes or Ctrl-C.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Initialize Logging                                                  │
/// │     • tracing-subscriber with env filter, on stderr                     │
/// │     • Default: INFO (kiosk crates DEBUG), override with RUST_LOG        │
/// │                                                                         │
/// │  2. Load Configuration                                                  │
/// │     • KIOSK_* variables over defaults                                   │
/// │                                                                         │
/// │  3. Connect to Database                                                 │
/// │     • SQLite with WAL mode                                              │
/// │     • Run pending migrations                                            │
/// │                                                                         │
/// │  4. Serve Scans                                                         │
/// │     • stdin reader, debounced                                           │
/// │     • one JSON line per outcome on stdout                               │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = ConfigState::from_env();
    info!(
        store = %config.store_name,
        terminal = %config.terminal_id,
        grace_minutes = config.grace_minutes,
        "Starting kiosk station"
    );

    let db_path = database_path(&config)?;
    info!(?db_path, "Database path determined");

    let db = DbState::new(Database::new(DbConfig::new(db_path)).await?);
    info!("Database connected and migrations applied");

    let mut reader = LineReader::stdin(config.scan_debounce());
    let events = reader.connect()?;
    let mut stdout = tokio::io::stdout();

    tokio::select! {
        served = serve(events, &db, &config, &mut stdout) => {
            let handled = served?;
            info!(handled, "Reader closed");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
        }
    }

    reader.disconnect();
    db.inner().close().await;
    Ok(())
}

/// Handles reader events one at a time until the reader disconnects.
///
/// Scans are processed strictly in order, so two quick scans of the same
/// card can never both check in. Failed scans are reported and logged; the
/// loop keeps going. Returns the number of scans handled.
pub async fn serve<W>(
    mut events: mpsc::Receiver<NfcEvent>,
    db: &DbState,
    config: &ConfigState,
    out: &mut W,
) -> std::io::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut handled = 0;

    while let Some(event) = events.recv().await {
        match event {
            NfcEvent::Connected => info!("NFC reader connected"),
            NfcEvent::Disconnected => {
                info!("NFC reader disconnected");
                break;
            }
            NfcEvent::Error { message } => warn!(%message, "NFC reader error"),
            NfcEvent::TagScanned { uid, .. } => {
                handled += 1;
                let line = match handle_scan(db, config, &uid).await {
                    Ok(outcome) => serde_json::to_string(&ScanReport::Scan {
                        uid: &uid,
                        outcome: &outcome,
                    }),
                    Err(e) => {
                        error!(nfc_uid = %uid, code = ?e.code, error = %e.message, "Scan failed");
                        serde_json::to_string(&ScanReport::ScanFailed { uid: &uid, error: &e })
                    }
                };
                let mut line = line.map_err(std::io::Error::other)?;
                line.push('\n');
                out.write_all(line.as_bytes()).await?;
                out.flush().await?;
            }
        }
    }

    Ok(handled)
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr; stdout carries the scan reports.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kiosk=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Determines the database file path.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.kiosk.pos/kiosk.db`
/// - **Windows**: `%APPDATA%\kiosk\pos\kiosk.db`
/// - **Linux**: `~/.local/share/pos/kiosk.db`
///
/// `KIOSK_DB_PATH` overrides it.
fn database_path(config: &ConfigState) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = &config.db_path {
        return Ok(path.clone());
    }

    let proj_dirs =
        ProjectDirs::from("com", "kiosk", "pos").ok_or("Could not determine app data directory")?;

    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("kiosk.db"))
}
