//! # Storekeeper
//!
//! Observable asynchronous state for Rust, built on tokio.
//!
//! ## Store
//!
//! A [`Store`] owns one piece of state produced by an async loader, an
//! optional summarizer deriving a summary from it, and a small lifecycle:
//! not-started → loading → ready or errored. Observers subscribe by name and
//! are notified synchronously when an operation begins and, after a short
//! configurable delay, when it ends.
//!
//! ## Collection
//!
//! A [`Collection`] owns a fixed, ordered set of named members. Starting it
//! starts every member concurrently; once all of them are ready it folds
//! their summaries in declaration order into one value, exactly once per
//! round. Any member failure is reported as the collection's error right
//! away.
//!
//! ```
//! use storekeeper::{Collection, StartOptions, Store};
//!
//! type Group = Store<&'static str, Vec<u32>, u32>;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let collection = Collection::builder(["north", "south"], |_| -> Group {
//!     Store::builder(Vec::new, |region: &'static str| async move {
//!         Ok(if region == "north" { vec![1, 2] } else { vec![3] })
//!     })
//!     .summarizer(|_region, sales: Vec<u32>| async move { Ok(sales.iter().sum()) })
//!     .build()
//! })
//! .zero_summary(|| 0)
//! .reducer(|total: u32, group: &Group| total + group.summary().unwrap_or(0))
//! .build()
//! .unwrap();
//!
//! collection.start(StartOptions::default());
//! while !collection.is_ready() {
//!     tokio::time::sleep(std::time::Duration::from_millis(5)).await;
//! }
//! assert_eq!(collection.summary(), Some(6));
//! # }
//! ```

pub mod collection;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod loadable;
pub mod observer;
pub mod store;
mod task;

// Re-export main types for convenience
pub use collection::{Collection, CollectionBuilder};
pub use config::{StartOptions, StoreConfig};
pub use error::ConfigError;
pub use lifecycle::{Lifecycle, Readiness};
pub use loadable::Loadable;
pub use observer::{Observer, ObserverRegistry, Subscription};
pub use store::{Store, StoreBuilder};
