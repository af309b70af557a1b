//! Bookmarks feature wiring
//!
//! Every connecting client gets the bani listing so its bookmarks view can
//! open content without a search round trip.

use serde::Serialize;
use std::sync::Arc;

use crate::protocol::{events, lifecycle, to_payload};
use crate::provider::DataProvider;
use crate::server::socket::SocketServer;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Bookmark {
    #[serde(rename = "type")]
    kind: &'static str,
    id: i64,
    name_gurmukhi: String,
}

pub fn attach(socket: &SocketServer, provider: Arc<dyn DataProvider>) {
    socket.on(lifecycle::CLIENT_CONNECTED, move |_, context| {
        let provider = provider.clone();
        async move {
            let bookmarks: Vec<Bookmark> = provider
                .banis()
                .await
                .into_iter()
                .map(|bani| Bookmark {
                    kind: "bani",
                    id: bani.id,
                    name_gurmukhi: bani.name_gurmukhi,
                })
                .collect();

            context.json(events::BOOKMARKS_LIST, to_payload(&bookmarks));
        }
    });
}
