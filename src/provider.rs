//! Read-only text data provider
//!
//! The line/shabad/bani retrieval layer is an external collaborator; this
//! module pins down its contract and ships an in-memory, JSON-backed
//! implementation so the binaries and tests have a library to serve. All
//! lookups signal "not found" with an empty result rather than an error.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::constants::SEARCH_RESULTS_LIMIT;
use crate::content::{Bani, BaniSummary, Line, Shabad};
use crate::error::Result;
use crate::protocol::SearchOptions;
use crate::storage;

/// Contract of the text retrieval layer.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn shabad(&self, id: &str) -> Option<Shabad>;

    async fn shabad_by_order_id(&self, order_id: i64) -> Option<Shabad>;

    async fn bani(&self, id: i64) -> Option<Bani>;

    /// All known banis, for the bookmarks listing.
    async fn banis(&self) -> Vec<BaniSummary>;

    /// Search by the first letter of each word.
    async fn first_letter_search(&self, query: &str, options: &SearchOptions) -> Vec<Line>;

    /// Search by whole-text substring.
    async fn full_word_search(&self, query: &str, options: &SearchOptions) -> Vec<Line>;
}

/// On-disk library shape consumed by [`JsonProvider`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Library {
    shabads: Vec<Shabad>,
    banis: Vec<Bani>,
}

/// In-memory provider backed by a single JSON library file.
pub struct JsonProvider {
    shabads: HashMap<String, Shabad>,
    shabads_by_order: HashMap<i64, String>,
    banis: HashMap<i64, Bani>,
}

impl JsonProvider {
    /// Load a library file.
    pub async fn load(path: &Path) -> Result<Self> {
        let value = storage::read_json(path).await?;
        let library: Library = serde_json::from_value(value).map_err(|source| {
            crate::error::StorageError::Corrupt {
                path: path.display().to_string(),
                source,
            }
        })?;

        info!(
            shabads = library.shabads.len(),
            banis = library.banis.len(),
            "loaded library from {}",
            path.display()
        );

        Ok(Self::from_library(library.shabads, library.banis))
    }

    /// Build a provider from already-loaded content.
    pub fn from_library(shabads: Vec<Shabad>, banis: Vec<Bani>) -> Self {
        let shabads_by_order = shabads
            .iter()
            .map(|shabad| (shabad.order_id, shabad.id.clone()))
            .collect();
        let shabads = shabads
            .into_iter()
            .map(|shabad| (shabad.id.clone(), shabad))
            .collect();
        let banis = banis.into_iter().map(|bani| (bani.id, bani)).collect();

        Self {
            shabads,
            shabads_by_order,
            banis,
        }
    }

    /// A provider with no content at all.
    pub fn empty() -> Self {
        Self::from_library(Vec::new(), Vec::new())
    }

    fn search_lines(&self, matches: impl Fn(&Line) -> bool) -> Vec<Line> {
        let mut results = Vec::new();

        for shabad in self.shabads.values() {
            for line in &shabad.lines {
                if results.len() == SEARCH_RESULTS_LIMIT {
                    return results;
                }
                if matches(line) {
                    results.push(line.clone());
                }
            }
        }

        results
    }
}

/// The first letter of every whitespace-separated token of a line.
fn first_letters(text: &str) -> String {
    text.split_whitespace()
        .filter_map(|token| token.chars().next())
        .collect()
}

#[async_trait]
impl DataProvider for JsonProvider {
    async fn shabad(&self, id: &str) -> Option<Shabad> {
        self.shabads.get(id).cloned()
    }

    async fn shabad_by_order_id(&self, order_id: i64) -> Option<Shabad> {
        let id = self.shabads_by_order.get(&order_id)?;
        self.shabads.get(id).cloned()
    }

    async fn bani(&self, id: i64) -> Option<Bani> {
        self.banis.get(&id).cloned()
    }

    async fn banis(&self) -> Vec<BaniSummary> {
        let mut summaries: Vec<BaniSummary> = self
            .banis
            .values()
            .map(|bani| BaniSummary {
                id: bani.id,
                name_gurmukhi: bani.name_gurmukhi.clone(),
            })
            .collect();
        summaries.sort_by_key(|summary| summary.id);
        summaries
    }

    async fn first_letter_search(&self, query: &str, _options: &SearchOptions) -> Vec<Line> {
        if query.is_empty() {
            return Vec::new();
        }
        self.search_lines(|line| first_letters(&line.gurmukhi).contains(query))
    }

    async fn full_word_search(&self, query: &str, _options: &SearchOptions) -> Vec<Line> {
        if query.is_empty() {
            return Vec::new();
        }
        self.search_lines(|line| line.gurmukhi.contains(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, gurmukhi: &str) -> Line {
        Line {
            id: id.to_string(),
            gurmukhi: gurmukhi.to_string(),
            shabad_id: None,
            source_page: None,
            type_id: None,
            line_group: None,
        }
    }

    fn provider() -> JsonProvider {
        JsonProvider::from_library(
            vec![
                Shabad {
                    id: "S1".to_string(),
                    order_id: 5,
                    writer_id: 1,
                    source_id: 1,
                    section: String::new(),
                    lines: vec![line("L1", "gur bin Gor AMDwr"), line("L2", "gurU ibnu smJ n AwvY")],
                },
                Shabad {
                    id: "S2".to_string(),
                    order_id: 6,
                    writer_id: 1,
                    source_id: 1,
                    section: String::new(),
                    lines: vec![line("L3", "so siqguru ipAwrw")],
                },
            ],
            vec![Bani {
                id: 2,
                name_gurmukhi: "jpujI".to_string(),
                lines: vec![line("B1", "Awid scu")],
            }],
        )
    }

    #[tokio::test]
    async fn test_lookup_by_id_and_order() {
        let provider = provider();

        assert_eq!(provider.shabad("S1").await.unwrap().order_id, 5);
        assert_eq!(provider.shabad_by_order_id(6).await.unwrap().id, "S2");
        assert!(provider.shabad("nope").await.is_none());
        assert!(provider.shabad_by_order_id(7).await.is_none());
        assert_eq!(provider.bani(2).await.unwrap().name_gurmukhi, "jpujI");
    }

    #[tokio::test]
    async fn test_bani_listing_is_sorted() {
        let provider = JsonProvider::from_library(
            Vec::new(),
            vec![
                Bani {
                    id: 4,
                    name_gurmukhi: "cOpeI".to_string(),
                    lines: vec![line("B2", "hmrI kro hwQ dY rYw")],
                },
                Bani {
                    id: 2,
                    name_gurmukhi: "jpujI".to_string(),
                    lines: vec![line("B1", "Awid scu")],
                },
            ],
        );

        let ids: Vec<i64> = provider.banis().await.iter().map(|b| b.id).collect();

        assert_eq!(ids, vec![2, 4]);
    }

    #[tokio::test]
    async fn test_first_letter_search_matches_initials() {
        let provider = provider();
        let options = SearchOptions::default();

        let results = provider.first_letter_search("gbG", &options).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "L1");
        assert!(provider.first_letter_search("", &options).await.is_empty());
    }

    #[tokio::test]
    async fn test_full_word_search_matches_substrings() {
        let provider = provider();
        let options = SearchOptions::default();

        let results = provider.full_word_search("siqguru", &options).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "L3");
    }
}
