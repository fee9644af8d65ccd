use futures::future::BoxFuture;

use crate::config::StartOptions;
use crate::observer::{Observer, Subscription};

/// The capability a [`Collection`](crate::Collection) needs from its members.
///
/// Implemented by [`Store`](crate::Store), and by `Collection` itself for any
/// key type, so collections can be nested.
pub trait Loadable<K>: Send + Sync + 'static {
    /// Current error message, empty when there is none.
    fn error(&self) -> String;

    fn is_loading(&self) -> bool;

    fn is_ready(&self) -> bool;

    fn subscribe(&self, name: String, observer: Observer) -> Subscription;

    /// Begin loading `key`.
    ///
    /// The begin phase (flags and begin notification) must happen before this
    /// returns; the returned future carries the rest of the operation.
    fn start(&self, key: K, options: StartOptions) -> BoxFuture<'static, ()>;
}
