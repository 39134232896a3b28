use crate::error::Error;
use crate::notify::Completion;
use crate::types::{DeviceInfo, SessionId};

/// Position of a session in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum SessionState {
    #[display("idle")]
    Idle,
    #[display("fetching device ip")]
    FetchingDeviceIp,
    #[display("fetching start url")]
    FetchingStartUrl,
    #[display("dispatching auth call")]
    DispatchingAuthCall,
    #[display("awaiting auth response")]
    AwaitingAuthResponse,
    #[display("chasing redirect")]
    RedirectChase,
    #[display("fetching finish url")]
    FetchingFinishUrl,
    #[display("completed")]
    Completed,
    #[display("failed")]
    Failed,
}

impl SessionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// State of one authentication attempt.
///
/// Owned by exactly one run; two runs never share a session.
#[derive(Debug, Clone)]
pub struct AuthenticationSession {
    id: SessionId,
    pub(crate) device_ip: Option<String>,
    start_url: String,
    finish_url: String,
    pub(crate) target_url: String,
    pub(crate) vfp: Option<String>,
    pub(crate) final_vfp: Option<String>,
    pub(crate) is_post_flow: bool,
    pub(crate) redirects: usize,
    in_progress: bool,
    state: SessionState,
    completion: Option<Completion>,
}

impl AuthenticationSession {
    #[must_use]
    pub fn new(start_url: impl Into<String>, finish_url: impl Into<String>) -> Self {
        Self {
            id: SessionId::generate(),
            device_ip: None,
            start_url: start_url.into(),
            finish_url: finish_url.into(),
            target_url: String::new(),
            vfp: None,
            final_vfp: None,
            is_post_flow: false,
            redirects: 0,
            in_progress: false,
            state: SessionState::Idle,
            completion: None,
        }
    }

    /// Marks the session as running. A session runs at most once; a closed
    /// session stays closed.
    pub(crate) fn begin(&mut self) -> Result<(), Error> {
        if self.in_progress || self.state != SessionState::Idle {
            return Err(Error::InProgress);
        }
        self.in_progress = true;
        Ok(())
    }

    pub(crate) fn enter(&mut self, state: SessionState) {
        tracing::debug!(session_id = %self.id, from = %self.state, to = %state, "Session transition");
        self.state = state;
    }

    /// Records the terminal result and closes the session.
    pub(crate) fn close(&mut self, completion: Completion) -> Completion {
        self.enter(if completion.authenticated {
            SessionState::Completed
        } else {
            SessionState::Failed
        });
        self.completion = Some(completion.clone());
        self.in_progress = false;
        completion
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    #[must_use]
    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    #[must_use]
    pub fn finish_url(&self) -> &str {
        &self.finish_url
    }

    #[must_use]
    pub fn device_ip(&self) -> Option<&str> {
        self.device_ip.as_deref()
    }

    /// Current carrier URL; changes as redirects are chased.
    #[must_use]
    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    #[must_use]
    pub fn vfp(&self) -> Option<&str> {
        self.vfp.as_deref()
    }

    /// Token sent to the finish endpoint.
    #[must_use]
    pub fn final_vfp(&self) -> Option<&str> {
        self.final_vfp.as_deref()
    }

    #[must_use]
    pub fn is_post_flow(&self) -> bool {
        self.is_post_flow
    }

    #[must_use]
    pub fn redirects(&self) -> usize {
        self.redirects
    }

    /// Terminal result; `None` until the session closes.
    #[must_use]
    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.completion.as_ref().is_some_and(|c| c.authenticated)
    }

    /// Subscriber details; present only after a successful run.
    #[must_use]
    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.completion.as_ref().and_then(|c| c.device.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AuthenticationSession {
        AuthenticationSession::new("https://app.example/start", "https://app.example/finish")
    }

    #[test]
    fn new_session_is_idle() {
        let s = session();
        assert_eq!(s.state(), SessionState::Idle);
        assert!(!s.in_progress());
        assert!(s.completion().is_none());
        assert_eq!(s.start_url(), "https://app.example/start");
        assert_eq!(s.finish_url(), "https://app.example/finish");
    }

    #[test]
    fn begin_refuses_second_start() {
        let mut s = session();
        s.begin().unwrap();
        assert!(s.in_progress());
        assert!(matches!(s.begin(), Err(Error::InProgress)));
    }

    #[test]
    fn closed_session_cannot_restart() {
        let mut s = session();
        s.begin().unwrap();
        s.close(Completion::failure(&Error::NoData));
        assert!(!s.in_progress());
        assert!(matches!(s.begin(), Err(Error::InProgress)));
    }

    #[test]
    fn close_records_success() {
        let mut s = session();
        s.begin().unwrap();
        let device = DeviceInfo::new("+15551234567", "CarrierX", "alias1");
        s.close(Completion::success("Success.", device.clone()));
        assert_eq!(s.state(), SessionState::Completed);
        assert!(s.is_authenticated());
        assert_eq!(s.device_info(), Some(&device));
        assert!(s.state().is_terminal());
    }

    #[test]
    fn close_records_failure() {
        let mut s = session();
        s.begin().unwrap();
        s.close(Completion::failure(&Error::MissingVfp));
        assert_eq!(s.state(), SessionState::Failed);
        assert!(!s.is_authenticated());
        assert!(s.device_info().is_none());
    }

    #[test]
    fn sessions_get_distinct_ids() {
        assert_ne!(session().id(), session().id());
    }
}
