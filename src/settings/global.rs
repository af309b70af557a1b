//! Persisted global settings
//!
//! One settings file on the server, shared by every client. Loaded once at
//! startup, migrated to the current schema version, and written back on every
//! change. Constructed explicitly and passed into the feature modules that
//! need it.

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::reactive::{Subscribable, Subscription};
use crate::schema::{self, SchemaDefinition};
use crate::settings::server::{self, ServerSettings};
use crate::storage;

struct Inner {
    path: PathBuf,
    definition: SchemaDefinition<ServerSettings>,
    settings: Subscribable<ServerSettings>,
}

/// Handle to the global settings store. Cloning shares the store.
#[derive(Clone)]
pub struct GlobalSettings {
    inner: Arc<Inner>,
}

impl GlobalSettings {
    /// Load settings from `path`, migrating them to the current version. A
    /// missing or unreadable file is recreated from defaults; a blob that
    /// fails migration is a fatal startup error.
    pub async fn load(path: PathBuf) -> Result<Self> {
        info!("loading settings from {}", path.display());

        let definition = server::definition();

        let settings = match storage::read_json(&path).await {
            Ok(value) => {
                let version = schema::version_of(&value);
                definition.migrate(value, version)?
            }
            Err(err) => {
                warn!(%err, "settings file is corrupt or non-existent, recreating");
                ServerSettings::default()
            }
        };

        let global = Self {
            inner: Arc::new(Inner {
                path,
                definition,
                settings: Subscribable::new(settings),
            }),
        };

        // Write back immediately so the file is always at the current version.
        global.persist().await?;

        Ok(global)
    }

    pub fn get(&self) -> ServerSettings {
        self.inner.settings.get()
    }

    pub fn on_change(
        &self,
        callback: impl Fn(&ServerSettings) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.settings.on_change(callback)
    }

    /// Deep-merge a partial update, validate the result at the current
    /// version, notify subscribers, and persist.
    pub async fn save(&self, changed: Value) -> Result<()> {
        let current = schema::project(self.inner.definition.version(), &self.get())?;
        let next = self.inner.definition.parse(schema::merge(current, changed))?;

        self.inner.settings.set(next);
        self.persist().await
    }

    async fn persist(&self) -> Result<()> {
        info!("writing settings to {}", self.inner.path.display());

        let version = self.inner.definition.version();
        let tagged = schema::tag_version(schema::project(version, &self.get())?, version);

        storage::write_json(&self.inner.path, &tagged).await?;

        Ok(())
    }
}
