//! Lifecycle flags shared by stores and collections.

use chrono::{DateTime, Utc};

/// Coarse view of a [`Lifecycle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Readiness {
    NotStarted,
    Loading,
    Ready,
    Errored,
}

/// Observable flags of a store or collection.
///
/// `last_updated_at` is `None` until the first successful completion, so
/// `ready` holds exactly when there is no error, nothing is in flight and at
/// least one operation completed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Lifecycle {
    pub loading: bool,
    pub error: String,
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl Lifecycle {
    pub fn is_ready(&self) -> bool {
        self.error.is_empty() && !self.loading && self.last_updated_at.is_some()
    }

    pub fn readiness(&self) -> Readiness {
        if self.loading {
            Readiness::Loading
        } else if !self.error.is_empty() {
            Readiness::Errored
        } else if self.last_updated_at.is_some() {
            Readiness::Ready
        } else {
            Readiness::NotStarted
        }
    }

    pub(crate) fn begin(&mut self) {
        self.error.clear();
        self.loading = true;
    }

    /// End of a load: records the completion time.
    pub(crate) fn succeed(&mut self) {
        self.error.clear();
        self.loading = false;
        self.last_updated_at = Some(Utc::now());
    }

    /// End of an operation that does not count as a load.
    pub(crate) fn settle(&mut self) {
        self.loading = false;
    }

    pub(crate) fn fail(&mut self, error: String) {
        self.error = error;
        self.loading = false;
    }
}
