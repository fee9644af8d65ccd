//! Observable stores of asynchronously loaded state.
//!
//! A [`Store`] owns one state value, the loader that produces it and an
//! optional summarizer, and tracks the load lifecycle
//! (not-started → loading → ready/errored). Observers subscribe by name and
//! re-read the store's public accessors when notified.

mod store;

pub use store::{Store, StoreBuilder};
