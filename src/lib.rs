//! # Gurbani Presenter
//!
//! Live presentation controller for Gurbani: a backend process holds the
//! authoritative current-content/current-line state and broadcasts it over a
//! persistent WebSocket channel to every connected display and control client
//! (presenter, overlay, controller UI).
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             SERVER                               │
//! │                                                                  │
//! │   ┌─────────────────┐     ┌──────────────────┐                   │
//! │   │  Content State  │     │  Settings State  │                   │
//! │   │ (content::state)│     │ (settings::state)│                   │
//! │   └───────┬─────────┘     └────────┬─────────┘                   │
//! │           │ change events          │ change events               │
//! │           ▼                        ▼                             │
//! │   ┌──────────────────────────────────────────┐                   │
//! │   │      Socket Server (server::socket)      │                   │
//! │   │  one dispatcher task, host-keyed clients │                   │
//! │   └──────┬───────────────┬───────────────┬───┘                   │
//! └──────────┼───────────────┼───────────────┼───────────────────────┘
//!            │ {event, payload} JSON frames  │
//!            ▼               ▼               ▼
//!     ┌────────────┐  ┌────────────┐  ┌────────────┐
//!     │ Presenter  │  │  Overlay   │  │ Controller │
//!     │  (client)  │  │  (client)  │  │  (client)  │
//!     └────────────┘  └────────────┘  └────────────┘
//! ```
//!
//! Each client mirrors server state into observable cells (`client::cache`)
//! and reconnects automatically with jitter after a server restart.

pub mod client;
pub mod config;
pub mod content;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod reactive;
pub mod schema;
pub mod server;
pub mod settings;
pub mod storage;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default port for the server's HTTP/WebSocket endpoint
    pub const DEFAULT_PORT: u16 = 42446;

    /// Default bind address for the server
    pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

    /// Path of the WebSocket endpoint
    pub const SOCKET_PATH: &str = "/api";

    /// Base delay before a client reconnection attempt
    pub const RECONNECT_BASE_DELAY_MS: u64 = 300;

    /// Random jitter added on top of the base reconnection delay
    pub const RECONNECT_JITTER_MS: u64 = 200;

    /// Maximum number of lines returned for a single search query
    pub const SEARCH_RESULTS_LIMIT: usize = 50;

    /// File name of the persisted global settings
    pub const SETTINGS_FILE: &str = "settings.json";

    /// File name of the persisted client-local settings
    pub const CLIENT_SETTINGS_FILE: &str = "client-settings.json";
}
