//! Client-side synchronized cache
//!
//! One observable cell per inbound event type — not a generic key-value
//! store. UI layers read the cells; inbound events overwrite them. Settings
//! cells deep-compare before applying so a client's own update echoing back
//! from the server doesn't re-notify subscribers or re-persist.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::content::{BaniSummary, Content, Line};
use crate::protocol::{events, Envelope, SettingsView};
use crate::reactive::Subscribable;
use crate::settings::{ClientSettings, ServerSettings};

/// Connection state as the UI sees it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub connected_at: Option<DateTime<Utc>>,
}

pub struct ClientCache {
    pub content: Subscribable<Option<Content>>,
    pub line_id: Subscribable<Option<String>>,
    pub tracker_main_line_id: Subscribable<Option<String>>,
    pub tracker_next_line_id: Subscribable<Option<String>>,
    pub local_settings: Subscribable<Option<ClientSettings>>,
    pub global_settings: Subscribable<Option<ServerSettings>>,
    pub client_settings: Subscribable<HashMap<String, ClientSettings>>,
    pub search_results: Subscribable<Vec<Line>>,
    pub bookmarks: Subscribable<Vec<BaniSummary>>,
    pub status: Subscribable<ConnectionStatus>,
}

impl Default for ClientCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientCache {
    pub fn new() -> Self {
        Self {
            content: Subscribable::new(None),
            line_id: Subscribable::new(None),
            tracker_main_line_id: Subscribable::new(None),
            tracker_next_line_id: Subscribable::new(None),
            local_settings: Subscribable::new(None),
            global_settings: Subscribable::new(None),
            client_settings: Subscribable::new(HashMap::new()),
            search_results: Subscribable::new(Vec::new()),
            bookmarks: Subscribable::new(Vec::new()),
            status: Subscribable::new(ConnectionStatus::default()),
        }
    }

    /// Apply one inbound event to its cell.
    pub fn apply(&self, envelope: Envelope) {
        match envelope.event.as_str() {
            events::CONTENT_CURRENT => overwrite(&self.content, envelope.payload),
            events::LINE_CURRENT => overwrite(&self.line_id, envelope.payload),
            events::TRACKER_MAIN_LINE => overwrite(&self.tracker_main_line_id, envelope.payload),
            events::TRACKER_NEXT_LINE => overwrite(&self.tracker_next_line_id, envelope.payload),
            events::SEARCH_RESULTS => overwrite(&self.search_results, envelope.payload),
            events::BOOKMARKS_LIST => overwrite(&self.bookmarks, envelope.payload),
            events::SETTINGS_ALL => self.apply_settings(envelope.payload),
            other => debug!(event = other, "ignoring unknown event"),
        }
    }

    /// Settings updates are de-duplicated per cell: an unchanged section is
    /// skipped entirely, so echoes don't ripple back into subscribers.
    fn apply_settings(&self, payload: Value) {
        let view: SettingsView = match serde_json::from_value(payload) {
            Ok(view) => view,
            Err(err) => {
                warn!(%err, "malformed settings:all payload");
                return;
            }
        };

        if let Some(local) = view.local {
            if self.local_settings.get().as_ref() != Some(&local) {
                self.local_settings.set(Some(local));
            }
        }

        if self.global_settings.get().as_ref() != Some(&view.global) {
            self.global_settings.set(Some(view.global));
        }

        if self.client_settings.get() != view.clients {
            self.client_settings.set(view.clients);
        }
    }

    /// Flip the connection flag, stamping the connect time.
    pub fn mark_connected(&self, connected: bool) {
        self.status.set(ConnectionStatus {
            connected,
            connected_at: connected.then(Utc::now),
        });
    }
}

fn overwrite<T>(cell: &Subscribable<T>, payload: Value)
where
    T: Clone + serde::de::DeserializeOwned,
{
    match serde_json::from_value(payload) {
        Ok(value) => cell.set(value),
        Err(err) => warn!(%err, "malformed event payload"),
    }
}
