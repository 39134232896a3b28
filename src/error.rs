/// Status code reported for transport failures (no HTTP status was received).
pub const TRANSPORT_FAILURE_STATUS: i64 = 500;

/// Description reported for transport failures.
pub const TRANSPORT_FAILURE_DESCRIPTION: &str = "Unable to reach the authentication service";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The request never produced an HTTP response (DNS, refused connection, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// A leg answered with an unexpected HTTP status.
    #[error("HTTP {status}: {status_text}")]
    Http { status: u16, status_text: String },

    /// The start or finish endpoint reported a non-zero status.
    #[error("vendor status {status}: {description}")]
    Vendor { status: i64, description: String },

    /// A payload could not be decoded or lacked an expected field.
    #[error("unable to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    /// POST flow answered 200 without a body.
    #[error("data was not returned")]
    NoData,

    /// GET flow finished without a verification fingerprint.
    #[error("verification fingerprint was not returned")]
    MissingVfp,

    /// The carrier kept redirecting past the configured limit.
    #[error("redirect limit of {0} exceeded")]
    RedirectLimit(usize),

    /// A session was started twice. [`Authenticator`](crate::Authenticator)
    /// builds a fresh session per run, so its completions never carry this.
    #[error("authentication already in progress")]
    InProgress,

    #[error("configuration error: {0}")]
    Config(String),

    #[cfg(feature = "reqwest")]
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl Error {
    pub(crate) fn parse(what: &'static str, detail: impl std::fmt::Display) -> Self {
        Self::Parse {
            what,
            detail: detail.to_string(),
        }
    }

    /// Status code delivered to the completion callback for this failure.
    #[must_use]
    pub fn status_code(&self) -> i64 {
        match self {
            Self::Transport(_) => TRANSPORT_FAILURE_STATUS,
            Self::Http { status, .. } => i64::from(*status),
            Self::Vendor { status, .. } => *status,
            Self::Parse { .. } => 1,
            Self::NoData => 2,
            Self::MissingVfp => 3,
            Self::RedirectLimit(_) => 4,
            Self::InProgress => 409,
            Self::Config(_) => 400,
            #[cfg(feature = "reqwest")]
            Self::Client(_) => TRANSPORT_FAILURE_STATUS,
        }
    }

    /// Description delivered to the completion callback for this failure.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Transport(_) => TRANSPORT_FAILURE_DESCRIPTION.to_owned(),
            #[cfg(feature = "reqwest")]
            Self::Client(_) => TRANSPORT_FAILURE_DESCRIPTION.to_owned(),
            Self::Http { status_text, .. } => status_text.clone(),
            Self::Vendor { description, .. } => description.clone(),
            other => other.to_string(),
        }
    }
}
