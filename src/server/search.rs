//! Search feature wiring
//!
//! Results go back to the querying client only, never broadcast.

use std::sync::Arc;
use tracing::warn;

use crate::protocol::{commands, events, to_payload, SearchKind, SearchQuery};
use crate::provider::DataProvider;
use crate::server::socket::SocketServer;

pub fn attach(socket: &SocketServer, provider: Arc<dyn DataProvider>) {
    socket.on(commands::SEARCH_QUERY, move |payload, context| {
        let provider = provider.clone();
        async move {
            let query: SearchQuery = match serde_json::from_value(payload) {
                Ok(query) => query,
                Err(err) => {
                    warn!(%err, "malformed search query");
                    return;
                }
            };

            let results = match query.kind {
                SearchKind::FirstLetter => {
                    provider
                        .first_letter_search(&query.query, &query.options)
                        .await
                }
                SearchKind::FullWord => {
                    provider.full_word_search(&query.query, &query.options).await
                }
            };

            context.json(events::SEARCH_RESULTS, to_payload(&results));
        }
    });
}
