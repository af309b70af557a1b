//! Wire protocol
//!
//! Every message on the channel is a single JSON text frame of the shape
//! `{ "event": string, "payload": value }`. Commands travel client → server;
//! events travel server → client. Event names and payload shapes mirror the
//! original wire contract, so field names are camelCase and tags are
//! kebab-case strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::error;

use crate::error::NetworkError;
use crate::settings::{ClientSettings, ServerSettings};

/// Commands: client → server.
pub mod commands {
    pub const CONTENT_OPEN: &str = "content:open";
    pub const CONTENT_OPEN_NEXT: &str = "content:open-next";
    pub const CONTENT_OPEN_PREVIOUS: &str = "content:open-previous";
    pub const LINE_SET_CURRENT: &str = "content:line:set-current";
    pub const LINE_SET_NEXT: &str = "content:line:set-next";
    pub const LINE_SET_PREVIOUS: &str = "content:line:set-previous";
    pub const LINE_CLEAR: &str = "content:line:clear";
    pub const TRACKER_SET_MAIN_LINE: &str = "content:tracker:set-main-line";
    pub const TRACKER_SET_NEXT_LINE: &str = "content:tracker:set-next-line";
    pub const SEARCH_QUERY: &str = "search:query";
    pub const SETTINGS_ALL: &str = "settings:all";
}

/// Events: server → client.
pub mod events {
    pub const CONTENT_CURRENT: &str = "content:current";
    pub const LINE_CURRENT: &str = "content:line:current";
    pub const TRACKER_MAIN_LINE: &str = "content:tracker:main-line";
    pub const TRACKER_NEXT_LINE: &str = "content:tracker:next-line";
    pub const SETTINGS_ALL: &str = "settings:all";
    pub const SEARCH_RESULTS: &str = "search:results";
    pub const BOOKMARKS_LIST: &str = "bookmarks:list";
}

/// Synthetic lifecycle events, dispatched server-side only.
pub mod lifecycle {
    pub const CLIENT_CONNECTED: &str = "client:connected";
    pub const CLIENT_DISCONNECTED: &str = "client:disconnected";
}

/// One wire frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    pub payload: Value,
}

impl Envelope {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }

    /// Encode into a single text frame.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).expect("envelopes always serialize")
    }

    /// Decode a received text frame.
    pub fn decode(text: &str) -> Result<Self, NetworkError> {
        serde_json::from_str(text).map_err(|err| NetworkError::InvalidFrame(err.to_string()))
    }
}

/// Serialize an outbound payload. Our payload types cannot fail to
/// serialize; if one ever does, the frame degrades to `null` and the defect
/// is logged rather than taking the connection down.
pub fn to_payload<T: Serialize>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(value) => value,
        Err(err) => {
            error!(%err, "failed to serialize outbound payload");
            Value::Null
        }
    }
}

/// Payload of `content:open`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OpenTarget {
    #[serde(rename_all = "camelCase")]
    Shabad {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Bani {
        id: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line_id: Option<String>,
    },
}

/// Payload of `search:query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(rename = "type")]
    pub kind: SearchKind,
    pub query: String,
    #[serde(default)]
    pub options: SearchOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchKind {
    #[serde(rename = "first-letter")]
    FirstLetter,
    #[serde(rename = "full-word")]
    FullWord,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchOptions {
    pub translations: bool,
    pub transliterations: bool,
    pub citations: bool,
}

/// Payload of an inbound `settings:all` command. Sections are partial JSON
/// shapes; the settings aggregator merges and validates them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clients: Option<HashMap<String, Value>>,
}

/// Payload of an outbound `settings:all` event, customized per recipient:
/// `local` is the recipient's own settings (absent until it has written any),
/// `clients` holds every other public client, never the recipient itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<ClientSettings>,
    pub global: ServerSettings,
    #[serde(default)]
    pub clients: HashMap<String, ClientSettings>,
}
