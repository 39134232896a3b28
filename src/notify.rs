use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Error;
use crate::types::DeviceInfo;

/// Progress callback: `(percent_complete, activity)`.
pub type StatusFn = Arc<dyn Fn(u8, &str) + Send + Sync>;

/// Diagnostic narration callback.
pub type DebugFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Progress checkpoints reported through the status callback.
pub(crate) mod progress {
    pub const DEVICE_IP: u8 = 5;
    pub const START: u8 = 16;
    pub const AUTH: u8 = 33;
    pub const AUTH_RESPONSE: u8 = 55;
    pub const FINISH: u8 = 75;
    pub const FINISH_RESPONSE: u8 = 98;
    pub const DONE: u8 = 100;
}

/// Terminal result of one authentication attempt, delivered exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct Completion {
    pub status: i64,
    pub description: String,
    pub authenticated: bool,
    /// Present only when `authenticated` is true.
    pub device: Option<DeviceInfo>,
}

impl Completion {
    #[must_use]
    pub fn success(description: impl Into<String>, device: DeviceInfo) -> Self {
        Self {
            status: 0,
            description: description.into(),
            authenticated: true,
            device: Some(device),
        }
    }

    #[must_use]
    pub fn failure(error: &Error) -> Self {
        Self {
            status: error.status_code(),
            description: error.description(),
            authenticated: false,
            device: None,
        }
    }
}

/// Optional status and debug callbacks. Missing ones fall back to `tracing`.
#[derive(Clone, Default)]
pub struct Notifications {
    on_status: Option<StatusFn>,
    on_debug: Option<DebugFn>,
}

impl fmt::Debug for Notifications {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifications")
            .field("on_status", &self.on_status.is_some())
            .field("on_debug", &self.on_debug.is_some())
            .finish()
    }
}

impl Notifications {
    #[must_use]
    pub fn with_status(mut self, f: impl Fn(u8, &str) + Send + Sync + 'static) -> Self {
        self.on_status = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_debug(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_debug = Some(Arc::new(f));
        self
    }

    pub(crate) fn status(&self, percent: u8, activity: &str) {
        match &self.on_status {
            Some(f) => f(percent, activity),
            None => tracing::info!(target: "carrier_auth", percent, activity, "Status"),
        }
    }

    pub(crate) fn debug(&self, message: &str) {
        match &self.on_debug {
            Some(f) => f(message),
            None => tracing::debug!(target: "carrier_auth", "{message}"),
        }
    }
}
