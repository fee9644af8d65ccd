//! Barrier-synchronized aggregation over a fixed set of stores.
//!
//! A [`Collection`] starts all of its members, waits until every one of them
//! is ready and folds their summaries, in declaration order, into a single
//! value. Any member failure moves the collection to the errored state
//! without waiting for the others.

mod collection;
mod readiness;

pub use collection::{Collection, CollectionBuilder};
