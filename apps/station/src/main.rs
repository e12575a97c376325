//! # Kiosk Station Entry Point
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  USB NFC reader (keyboard mode) ──► stdin ──► LineReader               │
//! │                                                  │ NfcEvent             │
//! │                                                  ▼                      │
//! │                                  station loop ──► handle_scan           │
//! │                                                  │                      │
//! │                                                  ▼                      │
//! │                                  one JSON line per outcome on stdout    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load configuration from `KIOSK_*` variables
//! 3. Determine database path (app data directory)
//! 4. Connect to database & run migrations
//! 5. Connect the reader and serve scans until EOF or Ctrl-C

#[tokio::main]
async fn main() {
    if let Err(e) = kiosk_station::run().await {
        eprintln!("kiosk-station: {e}");
        std::process::exit(1);
    }
}
