//! Content feature wiring
//!
//! Connects the navigation state machine to the channel: state-cell changes
//! fan out to every client, new clients get the full current state replayed,
//! and inbound navigation commands map onto state operations. Malformed
//! payloads are logged and ignored; shared state never sees them.

use std::sync::Arc;
use tracing::warn;

use crate::content::ContentState;
use crate::protocol::{commands, events, lifecycle, to_payload, OpenTarget};
use crate::server::socket::SocketServer;

pub fn attach(socket: &SocketServer, state: Arc<ContentState>) {
    let broadcast = socket.broadcaster(events::CONTENT_CURRENT);
    let _ = state.content().on_change(move |content| broadcast(to_payload(content)));

    let broadcast = socket.broadcaster(events::LINE_CURRENT);
    let _ = state.line_id().on_change(move |line_id| broadcast(to_payload(line_id)));

    let broadcast = socket.broadcaster(events::TRACKER_MAIN_LINE);
    let _ = state
        .tracker_main_line_id()
        .on_change(move |line_id| broadcast(to_payload(line_id)));

    let broadcast = socket.broadcaster(events::TRACKER_NEXT_LINE);
    let _ = state
        .tracker_next_line_id()
        .on_change(move |line_id| broadcast(to_payload(line_id)));

    // A connecting (or reconnecting) client is rehydrated with the full
    // current state rather than incrementally patched.
    let replay = state.clone();
    socket.on(lifecycle::CLIENT_CONNECTED, move |_, context| {
        let state = replay.clone();
        async move {
            context.json(events::CONTENT_CURRENT, to_payload(&state.content().get()));
            context.json(events::LINE_CURRENT, to_payload(&state.line_id().get()));
            context.json(
                events::TRACKER_MAIN_LINE,
                to_payload(&state.tracker_main_line_id().get()),
            );
            context.json(
                events::TRACKER_NEXT_LINE,
                to_payload(&state.tracker_next_line_id().get()),
            );
        }
    });

    let open = state.clone();
    socket.on(commands::CONTENT_OPEN, move |payload, _| {
        let state = open.clone();
        async move {
            match serde_json::from_value::<OpenTarget>(payload) {
                Ok(target) => state.open(target).await,
                Err(err) => warn!(%err, "malformed content:open payload"),
            }
        }
    });

    let next_content = state.clone();
    socket.on(commands::CONTENT_OPEN_NEXT, move |_, _| {
        let state = next_content.clone();
        async move { state.set_next_content().await }
    });

    let previous_content = state.clone();
    socket.on(commands::CONTENT_OPEN_PREVIOUS, move |_, _| {
        let state = previous_content.clone();
        async move { state.set_previous_content().await }
    });

    let set_line = state.clone();
    socket.on(commands::LINE_SET_CURRENT, move |payload, _| {
        let state = set_line.clone();
        async move {
            match serde_json::from_value::<String>(payload) {
                Ok(id) => state.set_line(&id),
                Err(err) => warn!(%err, "malformed line id payload"),
            }
        }
    });

    let next_line = state.clone();
    socket.on(commands::LINE_SET_NEXT, move |_, _| {
        let state = next_line.clone();
        async move { state.set_next_line() }
    });

    let previous_line = state.clone();
    socket.on(commands::LINE_SET_PREVIOUS, move |_, _| {
        let state = previous_line.clone();
        async move { state.set_previous_line() }
    });

    let clear_line = state.clone();
    socket.on(commands::LINE_CLEAR, move |_, _| {
        let state = clear_line.clone();
        async move { state.clear_line() }
    });

    let tracker_main = state.clone();
    socket.on(commands::TRACKER_SET_MAIN_LINE, move |payload, _| {
        let state = tracker_main.clone();
        async move {
            match serde_json::from_value::<String>(payload) {
                Ok(id) => state.set_tracker_main_line(&id),
                Err(err) => warn!(%err, "malformed tracker line payload"),
            }
        }
    });

    let tracker_next = state;
    socket.on(commands::TRACKER_SET_NEXT_LINE, move |payload, _| {
        let state = tracker_next.clone();
        async move {
            match serde_json::from_value::<String>(payload) {
                Ok(id) => state.set_tracker_next_line(&id),
                Err(err) => warn!(%err, "malformed tracker line payload"),
            }
        }
    });
}
