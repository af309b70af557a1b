//! Client settings schema
//!
//! Version history:
//! - v0 — the pre-versioning shape: grouped `display` / `layout` / `theme` /
//!   `security` blocks.
//! - v1 — current: flattened, with the privacy flag at the top level, font
//!   sizes and language toggles grouped, and display renames applied.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::SchemaError;
use crate::schema::{self, MigrationStep, SchemaDefinition};

pub const VERSION: u32 = 1;

/// Per-client presentation settings, current shape.
///
/// Every field has a context-independent default, so partial blobs (and
/// partial migration projections) validate cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientSettings {
    /// When set, this client's settings are hidden from every other client.
    pub private: bool,
    pub previous_lines: u32,
    pub next_lines: u32,
    pub larivaar_gurbani: bool,
    pub larivaar_assist: bool,
    pub line_ending: bool,
    pub controller_zoom: f64,
    pub font_sizes: FontSizes,
    pub center_text: bool,
    pub spacing: Spacing,
    pub theme_name: String,
    pub background_image: bool,
    pub highlight_current_line: bool,
    pub dim_next_and_prev_lines: bool,
    pub translations: Translations,
    pub transliterations: Transliterations,
    pub hotkeys: HashMap<String, Vec<String>>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            private: false,
            previous_lines: 0,
            next_lines: 1,
            larivaar_gurbani: false,
            larivaar_assist: false,
            line_ending: true,
            controller_zoom: 1.0,
            font_sizes: FontSizes::default(),
            center_text: true,
            spacing: Spacing::default(),
            theme_name: "Day".to_string(),
            background_image: true,
            highlight_current_line: false,
            dim_next_and_prev_lines: true,
            translations: Translations::default(),
            transliterations: Transliterations::default(),
            hotkeys: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FontSizes {
    pub base: f64,
    pub relative_gurmukhi: f64,
    pub relative_english: f64,
    pub relative_punjabi: f64,
}

impl Default for FontSizes {
    fn default() -> Self {
        Self {
            base: 8.0,
            relative_gurmukhi: 1.0,
            relative_english: 0.6,
            relative_punjabi: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Translations {
    pub english: bool,
    pub spanish: bool,
    pub punjabi: bool,
}

impl Default for Translations {
    fn default() -> Self {
        Self {
            english: true,
            spanish: false,
            punjabi: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Transliterations {
    pub english: bool,
    pub hindi: bool,
    pub urdu: bool,
}

impl Default for Transliterations {
    fn default() -> Self {
        Self {
            english: true,
            hindi: false,
            urdu: false,
        }
    }
}

/// Vertical distribution of the current-line block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Spacing {
    #[default]
    #[serde(rename = "space-between")]
    SpaceBetween,
    #[serde(rename = "space-around")]
    SpaceAround,
    #[serde(rename = "space-evenly")]
    SpaceEvenly,
    #[serde(rename = "flex-start")]
    Start,
    #[serde(rename = "flex-end")]
    End,
    #[serde(rename = "center")]
    Center,
}

// An unknown wire value falls back to the default instead of rejecting the
// whole settings blob.
impl<'de> Deserialize<'de> for Spacing {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "space-between" => Spacing::SpaceBetween,
            "space-around" => Spacing::SpaceAround,
            "space-evenly" => Spacing::SpaceEvenly,
            "flex-start" => Spacing::Start,
            "flex-end" => Spacing::End,
            "center" => Spacing::Center,
            _ => Spacing::default(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ClientSettingsV0 {
    display: DisplayV0,
    layout: LayoutV0,
    theme: ThemeV0,
    security: SecurityV0,
    hotkeys: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DisplayV0 {
    previous_lines: u32,
    next_lines: u32,
    larivaar_gurbani: bool,
    larivaar_assist: bool,
    english_translation: bool,
    spanish_translation: bool,
    punjabi_translation: bool,
    english_transliteration: bool,
    hindi_transliteration: bool,
    urdu_transliteration: bool,
    line_ending: bool,
}

impl Default for DisplayV0 {
    fn default() -> Self {
        Self {
            previous_lines: 0,
            next_lines: 1,
            larivaar_gurbani: false,
            larivaar_assist: false,
            english_translation: true,
            spanish_translation: false,
            punjabi_translation: false,
            english_transliteration: true,
            hindi_transliteration: false,
            urdu_transliteration: false,
            line_ending: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LayoutV0 {
    controller_zoom: f64,
    presenter_font_size: f64,
    relative_gurmukhi_font_size: f64,
    relative_english_font_size: f64,
    relative_punjabi_font_size: f64,
    center_text: bool,
    spacing: Spacing,
}

impl Default for LayoutV0 {
    fn default() -> Self {
        Self {
            controller_zoom: 1.0,
            presenter_font_size: 8.0,
            relative_gurmukhi_font_size: 1.0,
            relative_english_font_size: 0.6,
            relative_punjabi_font_size: 0.7,
            center_text: true,
            spacing: Spacing::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ThemeV0 {
    theme_name: String,
    background_image: bool,
    highlight_current_line: bool,
    dim_next_and_prev_lines: bool,
}

impl Default for ThemeV0 {
    fn default() -> Self {
        Self {
            theme_name: "Day".to_string(),
            background_image: true,
            highlight_current_line: false,
            dim_next_and_prev_lines: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SecurityV0 {
    private: bool,
}

fn upgrade_v1(value: Value) -> Result<Value, SchemaError> {
    let from: ClientSettingsV0 = schema::validate(0, value)?;

    let next = ClientSettings {
        private: from.security.private,
        previous_lines: from.display.previous_lines,
        next_lines: from.display.next_lines,
        larivaar_gurbani: from.display.larivaar_gurbani,
        larivaar_assist: from.display.larivaar_assist,
        line_ending: from.display.line_ending,
        controller_zoom: from.layout.controller_zoom,
        font_sizes: FontSizes {
            base: from.layout.presenter_font_size,
            relative_gurmukhi: from.layout.relative_gurmukhi_font_size,
            relative_english: from.layout.relative_english_font_size,
            relative_punjabi: from.layout.relative_punjabi_font_size,
        },
        center_text: from.layout.center_text,
        spacing: from.layout.spacing,
        theme_name: from.theme.theme_name,
        background_image: from.theme.background_image,
        highlight_current_line: from.theme.highlight_current_line,
        dim_next_and_prev_lines: from.theme.dim_next_and_prev_lines,
        translations: Translations {
            english: from.display.english_translation,
            spanish: from.display.spanish_translation,
            punjabi: from.display.punjabi_translation,
        },
        transliterations: Transliterations {
            english: from.display.english_transliteration,
            hindi: from.display.hindi_transliteration,
            urdu: from.display.urdu_transliteration,
        },
        hotkeys: from.hotkeys,
    };

    schema::project(1, &next)
}

/// The registered client settings definition.
pub fn definition() -> SchemaDefinition<ClientSettings> {
    SchemaDefinition::new(
        VERSION,
        vec![MigrationStep {
            version: 1,
            up: upgrade_v1,
        }],
    )
    .expect("client settings migration chain is contiguous from version 0")
}
