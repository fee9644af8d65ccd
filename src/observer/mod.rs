//! Observer registration and notification.
//!
//! Every store and collection owns an [`ObserverRegistry`]: a mapping from
//! subscriber name to callback. Registering under an existing name replaces
//! the previous callback, and the returned [`Subscription`] removes exactly
//! the registration it was created for.

mod registry;

pub use registry::{Observer, ObserverRegistry, Subscription};
