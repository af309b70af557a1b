//! Settings schemas, persistence, and multi-client aggregation

pub mod client;
pub mod global;
pub mod server;
pub mod state;

pub use client::ClientSettings;
pub use global::GlobalSettings;
pub use server::ServerSettings;
pub use state::SettingsState;
