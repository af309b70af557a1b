//! Settings feature wiring
//!
//! Clients get their own settings view on connect and lose their entry on
//! disconnect. Whenever the public view or the global settings change, every
//! client receives a freshly customized `settings:all` — each host sees its
//! own settings as `local` and everyone else's public settings as `clients`.

use std::sync::Arc;
use tracing::error;

use crate::protocol::{commands, events, lifecycle, to_payload, PartialSettings};
use crate::server::socket::SocketServer;
use crate::settings::SettingsState;

pub fn attach(socket: &SocketServer, state: Arc<SettingsState>) {
    let connected = state.clone();
    socket.on(lifecycle::CLIENT_CONNECTED, move |_, context| {
        let state = connected.clone();
        async move {
            context.json(
                events::SETTINGS_ALL,
                to_payload(&state.client_settings(&context.host)),
            );
        }
    });

    let disconnected = state.clone();
    socket.on(lifecycle::CLIENT_DISCONNECTED, move |_, context| {
        let state = disconnected.clone();
        async move { state.remove_client(&context.host) }
    });

    let broadcast: Arc<dyn Fn() + Send + Sync> = {
        let socket = socket.clone();
        let state = state.clone();
        Arc::new(move || {
            socket.broadcast_each(events::SETTINGS_ALL, |host| {
                to_payload(&state.client_settings(host))
            });
        })
    };

    {
        let broadcast = broadcast.clone();
        let _ = state.public_settings().on_change(move |_| broadcast());
    }
    let _ = state.global().on_change(move |_| broadcast());

    let update = state;
    socket.on(commands::SETTINGS_ALL, move |payload, context| {
        let state = update.clone();
        async move {
            let settings: PartialSettings = match serde_json::from_value(payload) {
                Ok(settings) => settings,
                Err(err) => {
                    error!(host = %context.host, %err, "malformed settings payload");
                    return;
                }
            };

            // A rejected update aborts only this turn; the connection stays
            // open and prior state stands.
            if let Err(err) = state.set_settings(&context.host, settings).await {
                error!(host = %context.host, %err, "rejected settings update");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::GlobalSettings;
    use crate::storage::temp_path;
    use serde_json::json;

    async fn setup() -> SocketServer {
        let global = GlobalSettings::load(temp_path("settings-feature"))
            .await
            .unwrap();
        let state = Arc::new(SettingsState::new(global));
        let socket = SocketServer::for_tests();
        attach(&socket, state);
        socket
    }

    #[tokio::test]
    async fn test_connecting_client_receives_its_view() {
        let socket = setup().await;

        let mut client = socket.connect_test_client("hostA");
        let view = client.next_event(events::SETTINGS_ALL).await;

        assert!(view["local"].is_null());
        assert!(view["global"]["system"]["multipleDisplays"].as_bool().unwrap());
        assert_eq!(view["clients"], json!({}));
    }

    #[tokio::test]
    async fn test_local_update_is_broadcast_to_everyone_with_custom_views() {
        let socket = setup().await;
        let mut main = socket.connect_test_client("main");
        let mut other = socket.connect_test_client("other");
        let _ = main.next_event(events::SETTINGS_ALL).await;
        let _ = other.next_event(events::SETTINGS_ALL).await;

        main.send(
            commands::SETTINGS_ALL,
            json!({ "local": { "controllerZoom": 1.2 } }),
        );

        let main_view = main.next_event(events::SETTINGS_ALL).await;
        assert_eq!(main_view["local"]["controllerZoom"], 1.2);

        let other_view = other.next_event(events::SETTINGS_ALL).await;
        assert_eq!(other_view["clients"]["main"]["controllerZoom"], 1.2);
        assert!(other_view["clients"].get("other").is_none());
    }

    #[tokio::test]
    async fn test_private_clients_never_appear_in_other_views() {
        let socket = setup().await;
        let mut public = socket.connect_test_client("public");
        let mut private = socket.connect_test_client("private");
        let _ = public.next_event(events::SETTINGS_ALL).await;
        let _ = private.next_event(events::SETTINGS_ALL).await;

        private.send(
            commands::SETTINGS_ALL,
            json!({ "local": { "private": true } }),
        );

        let private_view = private.next_event(events::SETTINGS_ALL).await;
        assert_eq!(private_view["local"]["private"], true);

        let public_view = public.next_event(events::SETTINGS_ALL).await;
        assert!(public_view["clients"].get("private").is_none());
    }

    #[tokio::test]
    async fn test_disconnect_removes_the_client_entry() {
        let socket = setup().await;
        let leaver = socket.connect_test_client("leaver");
        let mut stayer = socket.connect_test_client("stayer");
        let _ = stayer.next_event(events::SETTINGS_ALL).await;

        leaver.send(commands::SETTINGS_ALL, json!({ "local": {} }));
        let view = stayer.next_event(events::SETTINGS_ALL).await;
        assert!(view["clients"].get("leaver").is_some());

        leaver.disconnect();

        let view = stayer.next_event(events::SETTINGS_ALL).await;
        assert!(view["clients"].get("leaver").is_none());
    }

    #[tokio::test]
    async fn test_global_update_reaches_every_client() {
        let socket = setup().await;
        let main = socket.connect_test_client("main");
        let mut other = socket.connect_test_client("other");
        let _ = other.next_event(events::SETTINGS_ALL).await;

        main.send(
            commands::SETTINGS_ALL,
            json!({ "global": { "overlay": { "name": "Lower Thirds" } } }),
        );

        let view = other.next_event(events::SETTINGS_ALL).await;
        assert_eq!(view["global"]["overlay"]["name"], "Lower Thirds");
    }
}
