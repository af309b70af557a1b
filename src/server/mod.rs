//! Server wiring
//!
//! Builds the socket channel, constructs the state machines, and attaches
//! each feature module. State is constructed explicitly and passed in, so
//! the whole server can be stood up inside a test.

pub mod bookmarks;
pub mod content;
pub mod host;
pub mod search;
pub mod settings;
pub mod socket;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::content::ContentState;
use crate::error::{NetworkError, Result};
use crate::provider::DataProvider;
use crate::server::socket::{HostResolver, SocketServer};
use crate::settings::{GlobalSettings, SettingsState};

pub struct Server {
    socket: SocketServer,
    content: Arc<ContentState>,
    settings: Arc<SettingsState>,
}

impl Server {
    pub fn new(provider: Arc<dyn DataProvider>, global: GlobalSettings) -> Self {
        Self::with_resolver(provider, global, host::default_resolver())
    }

    pub fn with_resolver(
        provider: Arc<dyn DataProvider>,
        global: GlobalSettings,
        resolver: HostResolver,
    ) -> Self {
        let socket = SocketServer::new(resolver);
        let content = Arc::new(ContentState::new(provider.clone()));
        let settings = Arc::new(SettingsState::new(global));

        settings::attach(&socket, settings.clone());
        search::attach(&socket, provider.clone());
        content::attach(&socket, content.clone());
        bookmarks::attach(&socket, provider);

        Self {
            socket,
            content,
            settings,
        }
    }

    pub fn content(&self) -> &Arc<ContentState> {
        &self.content
    }

    pub fn settings(&self) -> &Arc<SettingsState> {
        &self.settings
    }

    pub fn socket(&self) -> &SocketServer {
        &self.socket
    }

    /// Bind and serve until the process exits.
    pub async fn serve(&self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| NetworkError::BindFailed(err.to_string()))?;

        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve_on(&self, listener: TcpListener) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!("listening on {addr}");
        }

        axum::serve(
            listener,
            self.socket
                .router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SyncClient;
    use crate::content::{Bani, Line, Shabad};
    use crate::protocol::OpenTarget;
    use crate::provider::JsonProvider;
    use crate::reactive::Subscribable;
    use crate::storage::temp_path;
    use serde_json::json;
    use std::time::Duration;

    fn line(id: &str) -> Line {
        Line {
            id: id.to_string(),
            gurmukhi: format!("quk {id}"),
            shabad_id: None,
            source_page: None,
            type_id: None,
            line_group: None,
        }
    }

    fn provider() -> Arc<JsonProvider> {
        Arc::new(JsonProvider::from_library(
            vec![Shabad {
                id: "S1".to_string(),
                order_id: 5,
                writer_id: 0,
                source_id: 0,
                section: String::new(),
                lines: vec![line("L1"), line("L2")],
            }],
            vec![Bani {
                id: 2,
                name_gurmukhi: "jpujI".to_string(),
                lines: vec![line("B1")],
            }],
        ))
    }

    async fn eventually<T: Clone>(cell: &Subscribable<T>, accept: impl Fn(&T) -> bool) -> T {
        for _ in 0..200 {
            let value = cell.get();
            if accept(&value) {
                return value;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met within two seconds");
    }

    #[tokio::test]
    async fn test_end_to_end_sync_over_real_sockets() {
        let global = GlobalSettings::load(temp_path("e2e")).await.unwrap();
        let server = Server::new(provider(), global);
        let content = server.content().clone();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { server.serve_on(listener).await });

        let client = SyncClient::connect(format!("ws://{addr}/api"), None)
            .await
            .unwrap();
        let cache = client.cache();

        // the connect handshake rehydrates the cache
        eventually(&cache.status, |status| status.connected).await;
        eventually(&cache.bookmarks, |bookmarks| !bookmarks.is_empty()).await;
        assert!(cache.global_settings.get().is_some());

        // command → server mutation → broadcast → cache
        client.open(OpenTarget::Shabad {
            id: "S1".to_string(),
            line_id: None,
        });
        eventually(&cache.line_id, |id| id.as_deref() == Some("L1")).await;

        client.set_next_line();
        eventually(&cache.line_id, |id| id.as_deref() == Some("L2")).await;
        assert_eq!(content.line_id().get().as_deref(), Some("L2"));

        // settings echo round trip
        client
            .update_local_settings(json!({ "controllerZoom": 1.5 }))
            .await
            .unwrap();
        eventually(&cache.local_settings, |settings| {
            settings
                .as_ref()
                .is_some_and(|settings| settings.controller_zoom == 1.5)
        })
        .await;
    }
}
