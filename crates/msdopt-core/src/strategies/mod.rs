//! Reference implementations of the search seams in [`crate::engine::search`].
//!
//! - [`grid::GridSearch`] - Exhaustive evaluation of a configured grid
//! - [`similarity`] - Cosine and Jensen-Shannon profile similarity

pub mod grid;
pub mod similarity;
