//! Server (global) settings schema
//!
//! Version history:
//! - v0 — the pre-versioning shape, carrying since-retired launch and
//!   analytics flags and the `overlayName` field.
//! - v1 — current: the retired system flags are dropped and the overlay name
//!   field is renamed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SchemaError;
use crate::schema::{self, MigrationStep, SchemaDefinition};

pub const VERSION: u32 = 1;

/// Server-wide settings shared by all clients, current shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerSettings {
    pub system: SystemSettings,
    pub notifications: NotificationSettings,
    pub overlay: OverlaySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SystemSettings {
    pub multiple_displays: bool,
    pub fullscreen_on_launch: bool,
    pub automatic_updates: bool,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            multiple_displays: true,
            fullscreen_on_launch: false,
            automatic_updates: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationSettings {
    pub connection_events: bool,
    pub disconnection_events: bool,
    pub download_events: bool,
    pub downloaded_events: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            connection_events: true,
            disconnection_events: false,
            download_events: true,
            downloaded_events: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlaySettings {
    pub name: String,
    pub larivaar_gurbani: bool,
    pub english_translation: bool,
    pub line_ending: bool,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            name: "Floating Top Captions".to_string(),
            larivaar_gurbani: false,
            english_translation: true,
            line_ending: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ServerSettingsV0 {
    system: SystemSettingsV0,
    notifications: NotificationSettings,
    overlay: OverlaySettingsV0,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SystemSettingsV0 {
    launch_on_startup: bool,
    multiple_displays: bool,
    fullscreen_on_launch: bool,
    server_analytics: bool,
    automatic_updates: bool,
    beta_opt_in: bool,
}

impl Default for SystemSettingsV0 {
    fn default() -> Self {
        Self {
            launch_on_startup: false,
            multiple_displays: true,
            fullscreen_on_launch: false,
            server_analytics: true,
            automatic_updates: true,
            beta_opt_in: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct OverlaySettingsV0 {
    overlay_name: String,
    larivaar_gurbani: bool,
    english_translation: bool,
    line_ending: bool,
}

impl Default for OverlaySettingsV0 {
    fn default() -> Self {
        Self {
            overlay_name: "Floating Top Captions".to_string(),
            larivaar_gurbani: false,
            english_translation: true,
            line_ending: true,
        }
    }
}

fn upgrade_v1(value: Value) -> Result<Value, SchemaError> {
    let from: ServerSettingsV0 = schema::validate(0, value)?;

    let next = ServerSettings {
        system: SystemSettings {
            multiple_displays: from.system.multiple_displays,
            fullscreen_on_launch: from.system.fullscreen_on_launch,
            automatic_updates: from.system.automatic_updates,
        },
        notifications: from.notifications,
        overlay: OverlaySettings {
            name: from.overlay.overlay_name,
            larivaar_gurbani: from.overlay.larivaar_gurbani,
            english_translation: from.overlay.english_translation,
            line_ending: from.overlay.line_ending,
        },
    };

    schema::project(1, &next)
}

/// The registered server settings definition.
pub fn definition() -> SchemaDefinition<ServerSettings> {
    SchemaDefinition::new(
        VERSION,
        vec![MigrationStep {
            version: 1,
            up: upgrade_v1,
        }],
    )
    .expect("server settings migration chain is contiguous from version 0")
}
