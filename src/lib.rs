#![doc = include_str!("../README.md")]

pub mod config;
mod dispatch;
pub mod error;
mod interpret;
pub mod notify;
pub mod orchestrator;
pub mod rewrite;
pub mod session;
pub mod transport;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::Error;
pub use interpret::{COMBINED_TOKEN_SEPARATOR, combined_token};
pub use notify::{Completion, DebugFn, Notifications, StatusFn};
#[cfg(feature = "reqwest")]
pub use orchestrator::ReqwestAuthenticator;
pub use orchestrator::{AuthParams, Authenticator};
pub use rewrite::{RewriteRule, RewriteTable};
pub use session::{AuthenticationSession, SessionState};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};
pub use types::{DeviceInfo, SessionId};
