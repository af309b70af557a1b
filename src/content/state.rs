//! Content navigation state
//!
//! The authoritative server-side state: the currently open content, the
//! current line pointer, and the two tracker pointers used by second-screen
//! views. Every operation validates its target against the open content and
//! turns a malformed or stale command into a logged no-op — a bad client
//! command must never corrupt shared state or surface an error on the
//! channel.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::content::{Content, Line};
use crate::protocol::OpenTarget;
use crate::provider::DataProvider;
use crate::reactive::{Mutable, ReadOnly, Subscribable};

pub struct ContentState {
    provider: Arc<dyn DataProvider>,
    content: Subscribable<Option<Content>>,
    line_id: Subscribable<Option<String>>,
    tracker_main_line_id: Subscribable<Option<String>>,
    tracker_next_line_id: Subscribable<Option<String>>,
    /// Line id → position in the current content, rebuilt on content change.
    line_index: Mutable<HashMap<String, usize>>,
}

fn index_lines(lines: &[Line]) -> HashMap<String, usize> {
    lines
        .iter()
        .enumerate()
        .map(|(position, line)| (line.id.clone(), position))
        .collect()
}

impl ContentState {
    pub fn new(provider: Arc<dyn DataProvider>) -> Self {
        let content: Subscribable<Option<Content>> = Subscribable::new(None);
        let line_index = Mutable::new(HashMap::new());

        {
            let line_index = line_index.clone();
            let _ = content.on_change(move |content: &Option<Content>| {
                let Some(content) = content else { return };
                line_index.set(index_lines(content.lines()));
            });
        }

        Self {
            provider,
            content,
            line_id: Subscribable::new(None),
            tracker_main_line_id: Subscribable::new(None),
            tracker_next_line_id: Subscribable::new(None),
            line_index,
        }
    }

    pub fn content(&self) -> ReadOnly<Option<Content>> {
        self.content.read_only()
    }

    pub fn line_id(&self) -> ReadOnly<Option<String>> {
        self.line_id.read_only()
    }

    pub fn tracker_main_line_id(&self) -> ReadOnly<Option<String>> {
        self.tracker_main_line_id.read_only()
    }

    pub fn tracker_next_line_id(&self) -> ReadOnly<Option<String>> {
        self.tracker_next_line_id.read_only()
    }

    /// Open a shabad, resetting both trackers. Lands on `line_id` when given,
    /// otherwise on the first line.
    pub async fn set_shabad(&self, id: &str, line_id: Option<&str>) {
        info!(%id, "setting shabad");

        let Some(shabad) = self.provider.shabad(id).await else {
            error!(%id, "shabad does not exist");
            return;
        };
        let Some(first_line) = shabad.lines.first() else {
            error!(%id, "shabad has no lines");
            return;
        };

        let landing = line_id.unwrap_or(&first_line.id).to_string();

        self.tracker_main_line_id.set(None);
        self.tracker_next_line_id.set(None);
        self.content.set(Some(Content::Shabad(shabad)));
        self.line_id.set(Some(landing));
    }

    /// Open a bani. Lands on `line_id` when given, otherwise on the first
    /// line. Trackers are untouched.
    pub async fn set_bani(&self, id: i64, line_id: Option<&str>) {
        info!(%id, "setting bani");

        let Some(bani) = self.provider.bani(id).await else {
            error!(%id, "bani does not exist");
            return;
        };
        let Some(first_line) = bani.lines.first() else {
            error!(%id, "bani has no lines");
            return;
        };

        let landing = line_id.unwrap_or(&first_line.id).to_string();

        self.content.set(Some(Content::Bani(bani)));
        self.line_id.set(Some(landing));
    }

    /// Dispatch a `content:open` command by content type.
    pub async fn open(&self, target: OpenTarget) {
        match target {
            OpenTarget::Shabad { id, line_id } => self.set_shabad(&id, line_id.as_deref()).await,
            OpenTarget::Bani { id, line_id } => self.set_bani(id, line_id.as_deref()).await,
        }
    }

    /// Set the current line. The id must belong to the open content.
    pub fn set_line(&self, id: &str) {
        info!(%id, "setting current line");

        if !self.line_index.get().contains_key(id) {
            error!(%id, "line not found in current content");
            return;
        }

        self.line_id.set(Some(id.to_string()));
    }

    /// Clear the current line.
    pub fn clear_line(&self) {
        self.line_id.set(None);

        info!("cleared current line");
    }

    /// Advance to the adjacent line. No wraparound: at the last line this is
    /// a no-op.
    pub fn set_next_line(&self) {
        info!("setting next line");

        let Some((content, position)) = self.current_position() else {
            return;
        };

        match content.lines().get(position + 1) {
            Some(next) => self.set_line(&next.id),
            None => error!("already at the last line"),
        }
    }

    /// Step back to the adjacent line. No wraparound: at the first line this
    /// is a no-op.
    pub fn set_previous_line(&self) {
        info!("setting previous line");

        let Some((content, position)) = self.current_position() else {
            return;
        };

        if position == 0 {
            error!("already at the first line");
            return;
        }

        let previous = &content.lines()[position - 1];
        self.set_line(&previous.id);
    }

    /// Open the adjacent content in publication order: the shabad at
    /// `orderId + 1` (landing on its first line) or the bani at `id + 1`.
    pub async fn set_next_content(&self) {
        info!("opening next content");

        let Some(content) = self.content.get() else {
            error!("no content set");
            return;
        };

        match content {
            Content::Shabad(shabad) => {
                let Some(next) = self.provider.shabad_by_order_id(shabad.order_id + 1).await
                else {
                    error!(order_id = shabad.order_id + 1, "no next shabad available");
                    return;
                };

                let first = next.lines.first().map(|line| line.id.clone());
                self.set_shabad(&next.id, first.as_deref()).await;
            }
            Content::Bani(bani) => self.set_bani(bani.id + 1, None).await,
        }
    }

    /// Open the preceding content: the shabad at `orderId - 1` (landing on
    /// its last line, so the displayed line is the first one scrolled into
    /// from that direction) or the bani at `id - 1` (landing on its first
    /// line).
    pub async fn set_previous_content(&self) {
        info!("opening previous content");

        let Some(content) = self.content.get() else {
            error!("no content set");
            return;
        };

        match content {
            Content::Shabad(shabad) => {
                let Some(previous) = self.provider.shabad_by_order_id(shabad.order_id - 1).await
                else {
                    error!(order_id = shabad.order_id - 1, "no previous shabad available");
                    return;
                };

                let last = previous.lines.last().map(|line| line.id.clone());
                self.set_shabad(&previous.id, last.as_deref()).await;
            }
            Content::Bani(bani) => self.set_bani(bani.id - 1, None).await,
        }
    }

    /// Mark the line the jatha is currently singing.
    pub fn set_tracker_main_line(&self, id: &str) {
        info!(%id, "setting tracker main line");

        if !self.tracker_target_is_valid(id) {
            return;
        }

        self.tracker_main_line_id.set(Some(id.to_string()));
    }

    /// Mark the line the jatha will sing next.
    pub fn set_tracker_next_line(&self, id: &str) {
        info!(%id, "setting tracker next line");

        if !self.tracker_target_is_valid(id) {
            return;
        }

        self.tracker_next_line_id.set(Some(id.to_string()));
    }

    fn tracker_target_is_valid(&self, id: &str) -> bool {
        if self.content.get().is_none() {
            error!("no content set");
            return false;
        }

        if !self.line_index.get().contains_key(id) {
            error!(%id, "line not found in current content");
            return false;
        }

        true
    }

    fn current_position(&self) -> Option<(Content, usize)> {
        let Some(content) = self.content.get() else {
            error!("no content set");
            return None;
        };

        let Some(line_id) = self.line_id.get() else {
            error!("no current line set");
            return None;
        };

        let Some(position) = self.line_index.get().get(&line_id).copied() else {
            error!(%line_id, "line not found in current content");
            return None;
        };

        Some((content, position))
    }
}
