//! Multi-client settings aggregation
//!
//! Reconciles one global settings object with the local settings of every
//! connected client. A client may always edit its own settings, including its
//! privacy flag; changes it pushes for *other* clients are filtered against
//! the privacy flags recorded here, never against what the sender claims.
//! The derived public view (privacy-filtered) is recomputed on every change
//! to the per-client map, and that recomputation is what drives broadcasts.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, SchemaError};
use crate::protocol::{PartialSettings, SettingsView};
use crate::reactive::{ReadOnly, Subscribable};
use crate::schema::{self, SchemaDefinition};
use crate::settings::client::{self, ClientSettings};
use crate::settings::global::GlobalSettings;

type ManyClientSettings = HashMap<String, ClientSettings>;

pub struct SettingsState {
    global: GlobalSettings,
    definition: Arc<SchemaDefinition<ClientSettings>>,
    many_client: Subscribable<ManyClientSettings>,
    public: Subscribable<ManyClientSettings>,
}

fn omit_private(all: &ManyClientSettings) -> ManyClientSettings {
    all.iter()
        .filter(|(_, settings)| !settings.private)
        .map(|(host, settings)| (host.clone(), settings.clone()))
        .collect()
}

impl SettingsState {
    pub fn new(global: GlobalSettings) -> Self {
        let many_client: Subscribable<ManyClientSettings> = Subscribable::new(HashMap::new());
        let public: Subscribable<ManyClientSettings> = Subscribable::new(HashMap::new());

        {
            let public = public.clone();
            let _ = many_client.on_change(move |all| public.set(omit_private(all)));
        }

        Self {
            global,
            definition: Arc::new(client::definition()),
            many_client,
            public,
        }
    }

    pub fn global(&self) -> &GlobalSettings {
        &self.global
    }

    /// The privacy-filtered view of every client's settings.
    pub fn public_settings(&self) -> ReadOnly<ManyClientSettings> {
        self.public.read_only()
    }

    /// Apply a settings update from `host`. Malformed sections fail schema
    /// validation and the error propagates; nothing of the update is applied
    /// beyond the sections already merged.
    pub async fn set_settings(&self, host: &str, update: PartialSettings) -> Result<()> {
        if let Some(global) = update.global {
            self.global.save(global).await?;
        }

        let current = self.many_client.get();
        let mut next = current.clone();

        if let Some(clients) = update.clients {
            for (id, partial) in clients {
                // Only accept changes for public devices: the recorded flag
                // is authoritative, not the sender's claim.
                if current.get(&id).is_some_and(|settings| settings.private) {
                    continue;
                }
                next.insert(id.clone(), self.merge_client(current.get(&id), partial)?);
            }
        }

        if let Some(local) = update.local {
            next.insert(
                host.to_string(),
                self.merge_client(current.get(host), local)?,
            );
        }

        self.many_client.set(next);

        Ok(())
    }

    fn merge_client(
        &self,
        current: Option<&ClientSettings>,
        partial: serde_json::Value,
    ) -> std::result::Result<ClientSettings, SchemaError> {
        let base = schema::project(
            self.definition.version(),
            &current.cloned().unwrap_or_default(),
        )?;
        self.definition.parse(schema::merge(base, partial))
    }

    /// The settings view for one client: its own settings, the global
    /// settings, and every *other* public client.
    pub fn client_settings(&self, host: &str) -> SettingsView {
        let mut clients = self.public.get();
        clients.remove(host);

        SettingsView {
            local: self.many_client.get().get(host).cloned(),
            global: self.global.get(),
            clients,
        }
    }

    /// Drop a client's settings entry (on disconnect).
    pub fn remove_client(&self, host: &str) {
        let mut next = self.many_client.get();
        if next.remove(host).is_some() {
            self.many_client.set(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::temp_path;
    use serde_json::json;

    async fn state() -> SettingsState {
        let global = GlobalSettings::load(temp_path("settings-state")).await.unwrap();
        SettingsState::new(global)
    }

    fn local(update: serde_json::Value) -> PartialSettings {
        PartialSettings {
            local: Some(update),
            ..PartialSettings::default()
        }
    }

    #[tokio::test]
    async fn test_local_settings_round_trip() {
        let state = state().await;

        state
            .set_settings("hostA", local(json!({ "controllerZoom": 1.2 })))
            .await
            .unwrap();

        let view = state.client_settings("hostA");
        assert_eq!(view.local.unwrap().controller_zoom, 1.2);
    }

    #[tokio::test]
    async fn test_own_entry_never_appears_in_clients() {
        let state = state().await;
        state.set_settings("hostA", local(json!({}))).await.unwrap();
        state.set_settings("hostB", local(json!({}))).await.unwrap();

        let view = state.client_settings("hostA");

        assert!(view.local.is_some());
        assert!(!view.clients.contains_key("hostA"));
        assert!(view.clients.contains_key("hostB"));
    }

    #[tokio::test]
    async fn test_private_clients_are_hidden_from_others_but_not_themselves() {
        let state = state().await;
        state.set_settings("hostA", local(json!({}))).await.unwrap();
        state
            .set_settings("hostB", local(json!({ "private": true })))
            .await
            .unwrap();

        let seen_by_a = state.client_settings("hostA");
        assert!(!seen_by_a.clients.contains_key("hostB"));

        let seen_by_b = state.client_settings("hostB");
        assert!(seen_by_b.local.unwrap().private);
        assert!(!seen_by_b.clients.contains_key("hostB"));
        assert!(seen_by_b.clients.contains_key("hostA"));
    }

    #[tokio::test]
    async fn test_remote_changes_to_private_clients_are_ignored() {
        let state = state().await;
        state
            .set_settings("hostB", local(json!({ "private": true })))
            .await
            .unwrap();

        // hostA tries to flip hostB public remotely
        state
            .set_settings(
                "hostA",
                PartialSettings {
                    clients: Some(HashMap::from([(
                        "hostB".to_string(),
                        json!({ "private": false }),
                    )])),
                    ..PartialSettings::default()
                },
            )
            .await
            .unwrap();

        let view = state.client_settings("hostB");
        assert!(view.local.unwrap().private);
    }

    #[tokio::test]
    async fn test_remote_changes_to_public_clients_apply() {
        let state = state().await;
        state.set_settings("hostB", local(json!({}))).await.unwrap();

        state
            .set_settings(
                "hostA",
                PartialSettings {
                    clients: Some(HashMap::from([(
                        "hostB".to_string(),
                        json!({ "nextLines": 3 }),
                    )])),
                    ..PartialSettings::default()
                },
            )
            .await
            .unwrap();

        let view = state.client_settings("hostB");
        assert_eq!(view.local.unwrap().next_lines, 3);
    }

    #[tokio::test]
    async fn test_a_client_may_toggle_its_own_privacy() {
        let state = state().await;
        state
            .set_settings("hostA", local(json!({ "private": true })))
            .await
            .unwrap();

        state
            .set_settings("hostA", local(json!({ "private": false })))
            .await
            .unwrap();

        let view = state.client_settings("hostB");
        assert!(view.clients.contains_key("hostA"));
    }

    #[tokio::test]
    async fn test_global_updates_are_merged_and_shared() {
        let state = state().await;

        state
            .set_settings(
                "hostA",
                PartialSettings {
                    global: Some(json!({ "system": { "multipleDisplays": false } })),
                    ..PartialSettings::default()
                },
            )
            .await
            .unwrap();

        let view = state.client_settings("hostB");
        assert!(!view.global.system.multiple_displays);
    }

    #[tokio::test]
    async fn test_malformed_local_settings_are_rejected() {
        let state = state().await;

        let result = state
            .set_settings("hostA", local(json!({ "nextLines": "lots" })))
            .await;

        assert!(result.is_err());
        assert!(state.client_settings("hostA").local.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_removes_the_entry() {
        let state = state().await;
        state.set_settings("hostA", local(json!({}))).await.unwrap();

        state.remove_client("hostA");

        assert!(state.client_settings("hostA").local.is_none());
        let view = state.client_settings("hostB");
        assert!(!view.clients.contains_key("hostA"));
    }

    #[tokio::test]
    async fn test_public_view_recomputes_on_every_change() {
        let state = state().await;
        let versions = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let observed = versions.clone();
        let _sub = state.public_settings().on_change(move |view| {
            observed.lock().push(view.len());
        });

        state.set_settings("hostA", local(json!({}))).await.unwrap();
        state
            .set_settings("hostB", local(json!({ "private": true })))
            .await
            .unwrap();
        state.remove_client("hostA");

        assert_eq!(*versions.lock(), vec![1, 1, 0]);
    }
}
