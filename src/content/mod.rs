//! Content data model and navigation state

pub mod model;
pub mod state;

pub use model::{Bani, BaniSummary, Content, Line, Shabad};
pub use state::ContentState;
