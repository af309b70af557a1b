//! Content data model
//!
//! A line is immutable once fetched; its identity is `id`. Content is an
//! ordered, non-empty sequence of lines — the order defines navigation
//! adjacency. Wire field names are camelCase.

use serde::{Deserialize, Serialize};

/// One atomic unit of text within a shabad or bani.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub id: String,
    pub gurmukhi: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shabad_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_group: Option<i64>,
}

/// A titled, ordered multi-line hymn, addressable by id and by a numeric
/// publication order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shabad {
    pub id: String,
    pub order_id: i64,
    #[serde(default)]
    pub writer_id: i64,
    #[serde(default)]
    pub source_id: i64,
    #[serde(default)]
    pub section: String,
    pub lines: Vec<Line>,
}

/// A named prayer composition: a fixed ordered sequence of lines addressable
/// by a small integer id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bani {
    pub id: i64,
    pub name_gurmukhi: String,
    pub lines: Vec<Line>,
}

/// The currently presentable content.
///
/// A tagged union so that every navigation operation matches exhaustively;
/// adding a third content type is a compile error until each operation
/// handles it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Shabad(Shabad),
    Bani(Bani),
}

impl Content {
    pub fn lines(&self) -> &[Line] {
        match self {
            Content::Shabad(shabad) => &shabad.lines,
            Content::Bani(bani) => &bani.lines,
        }
    }
}

/// Listing entry for a bani, used by the bookmarks feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaniSummary {
    pub id: i64,
    pub name_gurmukhi: String,
}
