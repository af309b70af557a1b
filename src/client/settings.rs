//! Client-local settings persistence
//!
//! The client's own settings blob, stored locally with the schema version
//! tagged inline, migrated on load and written back on every change. The
//! server's copy is authoritative once connected; this store exists so a
//! client renders with its own settings before the first handshake.

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::reactive::{Subscribable, Subscription};
use crate::schema::{self, SchemaDefinition};
use crate::settings::client::{self, ClientSettings};
use crate::storage;

struct Inner {
    path: PathBuf,
    definition: SchemaDefinition<ClientSettings>,
    settings: Subscribable<ClientSettings>,
}

#[derive(Clone)]
pub struct LocalSettings {
    inner: Arc<Inner>,
}

impl LocalSettings {
    /// Load the local blob, migrating it to the current version. A missing or
    /// unreadable blob is recreated from defaults.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let definition = client::definition();

        let settings = match storage::read_json(&path).await {
            Ok(value) => {
                let version = schema::version_of(&value);
                definition.migrate(value, version)?
            }
            Err(err) => {
                warn!(%err, "local settings non-existent or corrupted, resetting to defaults");
                ClientSettings::default()
            }
        };

        let store = Self {
            inner: Arc::new(Inner {
                path,
                definition,
                settings: Subscribable::new(settings),
            }),
        };

        store.persist().await?;

        Ok(store)
    }

    pub fn get(&self) -> ClientSettings {
        self.inner.settings.get()
    }

    pub fn on_change(
        &self,
        callback: impl Fn(&ClientSettings) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.settings.on_change(callback)
    }

    /// Merge a partial update, validate, notify, persist. Returns the new
    /// settings so the caller can push them to the server.
    pub async fn update(&self, partial: Value) -> Result<ClientSettings> {
        let version = self.inner.definition.version();
        let merged = schema::merge(schema::project(version, &self.get())?, partial);
        let next = self.inner.definition.parse(merged)?;

        self.inner.settings.set(next.clone());
        self.persist().await?;

        Ok(next)
    }

    /// Adopt settings received from the server. A no-op when nothing changed,
    /// so echoes of our own updates don't re-persist.
    pub async fn replace(&self, incoming: ClientSettings) -> Result<()> {
        if self.get() == incoming {
            return Ok(());
        }

        self.inner.settings.set(incoming);
        self.persist().await
    }

    async fn persist(&self) -> Result<()> {
        info!("writing local settings to {}", self.inner.path.display());

        let version = self.inner.definition.version();
        let tagged = schema::tag_version(schema::project(version, &self.get())?, version);

        storage::write_json(&self.inner.path, &tagged).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::temp_path;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_blob_resets_to_defaults() {
        let path = temp_path("local-missing");

        let store = LocalSettings::load(path.clone()).await.unwrap();

        assert_eq!(store.get(), ClientSettings::default());
        let written = storage::read_json(&path).await.unwrap();
        assert_eq!(schema::version_of(&written), client::VERSION);
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_v0_blob_migrates_on_load() {
        let path = temp_path("local-v0");
        storage::write_json(
            &path,
            &json!({ "theme": { "themeName": "Night" }, "security": { "private": true } }),
        )
        .await
        .unwrap();

        let store = LocalSettings::load(path.clone()).await.unwrap();

        assert_eq!(store.get().theme_name, "Night");
        assert!(store.get().private);
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_update_merges_and_persists() {
        let path = temp_path("local-update");
        let store = LocalSettings::load(path.clone()).await.unwrap();

        let next = store.update(json!({ "nextLines": 4 })).await.unwrap();

        assert_eq!(next.next_lines, 4);
        let written = storage::read_json(&path).await.unwrap();
        assert_eq!(written["nextLines"], 4);
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_replace_with_an_identical_value_does_not_notify() {
        let path = temp_path("local-replace");
        let store = LocalSettings::load(path.clone()).await.unwrap();
        let notified = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let observed = notified.clone();
        let _sub = store.on_change(move |_| {
            observed.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        store.replace(store.get()).await.unwrap();
        assert_eq!(notified.load(std::sync::atomic::Ordering::SeqCst), 0);

        let mut changed = store.get();
        changed.next_lines = 5;
        store.replace(changed).await.unwrap();
        assert_eq!(notified.load(std::sync::atomic::Ordering::SeqCst), 1);
        let _ = tokio::fs::remove_file(&path).await;
    }
}
