//! Client-side synchronized state
//!
//! [`SyncClient`] ties the pieces together: the reconnecting transport, the
//! event-to-cell cache, and optional local settings persistence. Commands are
//! typed methods; state arrives through the cache's observable cells.

pub mod cache;
pub mod settings;
pub mod transport;

use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

use crate::client::cache::{ClientCache, ConnectionStatus};
use crate::client::settings::LocalSettings;
use crate::client::transport::Transport;
use crate::error::Result;
use crate::protocol::{
    commands, events, to_payload, OpenTarget, PartialSettings, SearchQuery, SettingsView,
};

pub struct SyncClient {
    cache: Arc<ClientCache>,
    transport: Transport,
    local: Option<LocalSettings>,
}

impl SyncClient {
    /// Connect to a server. When `settings_path` is given, the client's own
    /// settings are persisted there and rehydrated on the next start.
    pub async fn connect(url: impl Into<String>, settings_path: Option<PathBuf>) -> Result<Self> {
        let cache = Arc::new(ClientCache::new());

        let local = match settings_path {
            Some(path) => Some(LocalSettings::load(path).await?),
            None => None,
        };

        let (incoming_tx, mut incoming) = mpsc::unbounded_channel();
        let transport = Transport::spawn(url.into(), incoming_tx);

        {
            let cache = cache.clone();
            let _ = transport
                .connected()
                .on_change(move |connected| cache.mark_connected(*connected));
        }

        {
            let cache = cache.clone();
            let local = local.clone();
            tokio::spawn(async move {
                while let Some(envelope) = incoming.recv().await {
                    if envelope.event == events::SETTINGS_ALL {
                        if let Some(store) = &local {
                            persist_incoming_local(store, &envelope.payload).await;
                        }
                    }
                    cache.apply(envelope);
                }
            });
        }

        Ok(Self {
            cache,
            transport,
            local,
        })
    }

    /// The observable cells mirroring server state.
    pub fn cache(&self) -> &ClientCache {
        &self.cache
    }

    pub fn status(&self) -> ConnectionStatus {
        self.cache.status.get()
    }

    pub fn open(&self, target: OpenTarget) {
        self.send(commands::CONTENT_OPEN, to_payload(&target));
    }

    pub fn open_next(&self) {
        self.send(commands::CONTENT_OPEN_NEXT, Value::Null);
    }

    pub fn open_previous(&self) {
        self.send(commands::CONTENT_OPEN_PREVIOUS, Value::Null);
    }

    pub fn set_line(&self, id: &str) {
        self.send(commands::LINE_SET_CURRENT, Value::String(id.to_string()));
    }

    pub fn set_next_line(&self) {
        self.send(commands::LINE_SET_NEXT, Value::Null);
    }

    pub fn set_previous_line(&self) {
        self.send(commands::LINE_SET_PREVIOUS, Value::Null);
    }

    pub fn clear_line(&self) {
        self.send(commands::LINE_CLEAR, Value::Null);
    }

    pub fn set_tracker_main_line(&self, id: &str) {
        self.send(
            commands::TRACKER_SET_MAIN_LINE,
            Value::String(id.to_string()),
        );
    }

    pub fn set_tracker_next_line(&self, id: &str) {
        self.send(
            commands::TRACKER_SET_NEXT_LINE,
            Value::String(id.to_string()),
        );
    }

    pub fn search(&self, query: SearchQuery) {
        self.send(commands::SEARCH_QUERY, to_payload(&query));
    }

    /// Update this client's own settings: merge locally, persist, and push
    /// the full result to the server.
    pub async fn update_local_settings(&self, partial: Value) -> Result<()> {
        let local = match &self.local {
            Some(store) => to_payload(&store.update(partial).await?),
            None => partial,
        };

        self.send_settings(PartialSettings {
            local: Some(local),
            ..PartialSettings::default()
        });

        Ok(())
    }

    /// Push a partial update to the shared global settings.
    pub fn update_global_settings(&self, partial: Value) {
        self.send_settings(PartialSettings {
            global: Some(partial),
            ..PartialSettings::default()
        });
    }

    /// Push updates to other (public) clients' settings.
    pub fn update_client_settings(&self, clients: HashMap<String, Value>) {
        self.send_settings(PartialSettings {
            clients: Some(clients),
            ..PartialSettings::default()
        });
    }

    fn send_settings(&self, settings: PartialSettings) {
        self.send(commands::SETTINGS_ALL, to_payload(&settings));
    }

    fn send(&self, event: &str, payload: Value) {
        self.transport.send(event, payload);
    }
}

async fn persist_incoming_local(store: &LocalSettings, payload: &Value) {
    let Ok(view) = serde_json::from_value::<SettingsView>(payload.clone()) else {
        return;
    };
    let Some(incoming) = view.local else { return };

    if let Err(err) = store.replace(incoming).await {
        warn!(%err, "failed to persist settings received from server");
    }
}
