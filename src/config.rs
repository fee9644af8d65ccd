use std::time::Duration;

use crate::error::DEFAULT_FALLBACK_ERROR;

/// Default gap between the end of an operation and its end notification.
pub const DEFAULT_NOTIFY_DELAY: Duration = Duration::from_millis(10);

/// Configuration shared by [`Store`](crate::Store) and [`Collection`](crate::Collection).
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Delay between finishing an operation and notifying observers of it.
    pub notify_delay: Duration,
    /// If set, replaces the text of every captured failure.
    pub error_override: Option<String>,
    /// Stored when a failure has an empty message.
    pub fallback_error: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            notify_delay: DEFAULT_NOTIFY_DELAY,
            error_override: None,
            fallback_error: DEFAULT_FALLBACK_ERROR.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn with_notify_delay(mut self, delay: Duration) -> Self {
        self.notify_delay = delay;
        self
    }

    pub fn with_error_override(mut self, message: impl Into<String>) -> Self {
        self.error_override = Some(message.into());
        self
    }

    pub fn with_fallback_error(mut self, message: impl Into<String>) -> Self {
        self.fallback_error = message.into();
        self
    }
}

/// Flags accepted by `start` on stores and collections.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartOptions {
    /// Load again even if the last load completed successfully.
    pub force_reload: bool,
    /// Run the summarizer after a successful load.
    pub compute_summary: bool,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            force_reload: false,
            compute_summary: true,
        }
    }
}

impl StartOptions {
    pub fn forced() -> Self {
        Self {
            force_reload: true,
            ..Self::default()
        }
    }

    pub fn without_summary(mut self) -> Self {
        self.compute_summary = false;
        self
    }
}
