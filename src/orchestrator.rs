use std::sync::Arc;

use url::Url;

use crate::config::Config;
use crate::dispatch::dispatch;
use crate::error::Error;
use crate::interpret::{Interpretation, interpret};
use crate::notify::{Completion, Notifications, progress};
use crate::session::{AuthenticationSession, SessionState};
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};
use crate::types::{DeviceInfo, FinishResponse, StartResponse};

#[cfg(feature = "reqwest")]
use crate::transport::ReqwestTransport;

/// Authenticator specialized for the default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestAuthenticator = Authenticator<ReqwestTransport>;

/// Per-call inputs of a handshake.
///
/// ```rust,ignore
/// let params = AuthParams::new("https://app.example/start", "https://app.example/finish")
///     .with_device_ip(false)
///     .on_status(|percent, activity| println!("{percent}% {activity}"));
/// ```
#[derive(Debug, Clone)]
pub struct AuthParams {
    start_url: String,
    finish_url: String,
    fetch_device_ip: bool,
    notifications: Notifications,
}

impl AuthParams {
    #[must_use]
    pub fn new(start_url: impl Into<String>, finish_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            finish_url: finish_url.into(),
            fetch_device_ip: true,
            notifications: Notifications::default(),
        }
    }

    /// Look up the device IP and pass it to the start endpoint (default: on).
    #[must_use]
    pub fn with_device_ip(mut self, fetch: bool) -> Self {
        self.fetch_device_ip = fetch;
        self
    }

    #[must_use]
    pub fn on_status(mut self, f: impl Fn(u8, &str) + Send + Sync + 'static) -> Self {
        self.notifications = self.notifications.with_status(f);
        self
    }

    #[must_use]
    pub fn on_debug(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.notifications = self.notifications.with_debug(f);
        self
    }
}

/// Drives carrier device authentication handshakes.
///
/// Holds only configuration and the transport; every run gets its own
/// [`AuthenticationSession`], so one `Authenticator` can serve any number of
/// concurrent handshakes.
pub struct Authenticator<T> {
    config: Arc<Config>,
    transport: Arc<T>,
}

// Manual Clone: avoid derive adding a `T: Clone` bound.
impl<T> Clone for Authenticator<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            transport: self.transport.clone(),
        }
    }
}

#[cfg(feature = "reqwest")]
impl Authenticator<ReqwestTransport> {
    /// Create an authenticator over the default reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, Error> {
        let transport = ReqwestTransport::new(config.user_agent())?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> Authenticator<T> {
    /// Use a custom transport (webview bridge, proxying client, test double).
    #[must_use]
    pub fn with_transport(config: Config, transport: T) -> Self {
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Starts a handshake in the background and returns immediately.
    ///
    /// `on_complete` runs exactly once, with the terminal [`Completion`].
    /// Must be called within a tokio runtime.
    ///
    /// No timeout is applied here: a transport call that never answers keeps
    /// the run pending. Bound it in the transport, e.g. reqwest clients built
    /// with `timeout` passed to [`ReqwestTransport::with_clients`].
    pub fn authenticate<F>(&self, params: AuthParams, on_complete: F) -> tokio::task::JoinHandle<()>
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move {
            let completion = this.run(params).await;
            on_complete(completion);
        })
    }

    /// Runs a handshake to its terminal result.
    ///
    /// Like [`authenticate`](Self::authenticate), waits as long as the
    /// transport does; timeouts belong in the transport.
    pub async fn run(&self, params: AuthParams) -> Completion {
        self.execute(params).await.1
    }

    /// Runs a handshake and returns the closed session for inspection.
    pub async fn run_session(&self, params: AuthParams) -> AuthenticationSession {
        self.execute(params).await.0
    }

    async fn execute(&self, params: AuthParams) -> (AuthenticationSession, Completion) {
        let AuthParams {
            start_url,
            finish_url,
            fetch_device_ip,
            notifications,
        } = params;
        let mut session = AuthenticationSession::new(start_url, finish_url);

        let result = match session.begin() {
            Ok(()) => self.drive(&mut session, &notifications, fetch_device_ip).await,
            Err(e) => Err(e),
        };

        let completion = match result {
            Ok(completion) => {
                tracing::info!(session_id = %session.id(), "Device authentication successful");
                completion
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %session.id(),
                    state = %session.state(),
                    error = %e,
                    "Device authentication failed"
                );
                notifications.debug(&format!("Authentication failed: {e}"));
                Completion::failure(&e)
            }
        };

        notifications.status(progress::DONE, "Complete");
        let completion = session.close(completion);
        (session, completion)
    }

    async fn drive(
        &self,
        session: &mut AuthenticationSession,
        notify: &Notifications,
        fetch_device_ip: bool,
    ) -> Result<Completion, Error> {
        if fetch_device_ip {
            self.device_ip_leg(session, notify).await?;
        }
        self.start_leg(session, notify).await?;
        let vfp = self.auth_leg(session, notify).await?;
        self.finish_leg(session, notify, &vfp).await
    }

    // ── Device IP ──────────────────────────────────────────────────

    async fn device_ip_leg(
        &self,
        session: &mut AuthenticationSession,
        notify: &Notifications,
    ) -> Result<(), Error> {
        session.enter(SessionState::FetchingDeviceIp);
        notify.status(progress::DEVICE_IP, "Fetching device IP");

        let response = self
            .fetch(HttpRequest::get(self.config.device_ip_url.as_str()), "device ip")
            .await?;
        let ip = response.text().trim().to_owned();
        notify.debug(&format!("Device IP: {ip}"));
        if !ip.is_empty() {
            session.device_ip = Some(ip);
        }
        Ok(())
    }

    // ── Start ──────────────────────────────────────────────────────

    async fn start_leg(
        &self,
        session: &mut AuthenticationSession,
        notify: &Notifications,
    ) -> Result<(), Error> {
        session.enter(SessionState::FetchingStartUrl);
        notify.status(progress::START, "Fetching start URL");

        let url = with_param(session.start_url(), "deviceIp", session.device_ip())?;
        let response = self.fetch(HttpRequest::get(url), "start").await?;
        let start: StartResponse = serde_json::from_slice(&response.body)
            .map_err(|e| Error::parse("start response", e))?;
        let target = start.into_target_url()?;

        session.target_url = self.config.rewrite_table.rewrite(&target);
        if session.target_url != target {
            notify.debug(&format!("Rewrote auth URL {target} -> {}", session.target_url));
        }
        Ok(())
    }

    // ── Auth ───────────────────────────────────────────────────────

    async fn auth_leg(
        &self,
        session: &mut AuthenticationSession,
        notify: &Notifications,
    ) -> Result<String, Error> {
        notify.status(progress::AUTH, "Authenticating device");

        loop {
            session.enter(SessionState::DispatchingAuthCall);
            let request = dispatch(session)?;
            let method = match request.method {
                Method::Get => "GET",
                Method::Post => "POST",
            };
            notify.debug(&format!("{method} {}", request.url));

            session.enter(SessionState::AwaitingAuthResponse);
            let response = self.send(request).await?;

            match interpret(session, &response)? {
                Interpretation::Follow(location) => {
                    if session.redirects >= self.config.max_redirects {
                        return Err(Error::RedirectLimit(self.config.max_redirects));
                    }
                    session.redirects += 1;
                    session.enter(SessionState::RedirectChase);
                    notify.debug(&format!(
                        "Redirect {} ({}) -> {location}",
                        session.redirects, response.status
                    ));
                    session.target_url = location;
                }
                Interpretation::Extracted(vfp) => {
                    notify.status(progress::AUTH_RESPONSE, "Device authenticated by carrier");
                    return Ok(vfp);
                }
            }
        }
    }

    // ── Finish ─────────────────────────────────────────────────────

    async fn finish_leg(
        &self,
        session: &mut AuthenticationSession,
        notify: &Notifications,
        vfp: &str,
    ) -> Result<Completion, Error> {
        session.enter(SessionState::FetchingFinishUrl);
        notify.status(progress::FINISH, "Fetching finish URL");

        if vfp.is_empty() {
            return Err(Error::MissingVfp);
        }
        let url = with_param(session.finish_url(), "vfp", Some(vfp))?;
        let response = self.fetch(HttpRequest::get(url), "finish").await?;
        notify.status(progress::FINISH_RESPONSE, "Reading authentication result");

        let finish: FinishResponse = serde_json::from_slice(&response.body)
            .map_err(|e| Error::parse("finish response", e))?;
        if finish.status != 0 {
            return Err(Error::Vendor {
                status: finish.status,
                description: finish.description,
            });
        }
        let details = finish
            .response
            .ok_or_else(|| Error::parse("finish response", "missing field `Response`"))?;

        Ok(Completion::success(
            finish.description,
            DeviceInfo::new(
                details.mobile_number,
                details.mobile_operator_name,
                details.payfone_alias,
            ),
        ))
    }

    // ── Helpers ────────────────────────────────────────────────────

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        self.transport
            .send(request)
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }

    /// Sends a straight-line leg; anything but 2xx is fatal.
    async fn fetch(&self, request: HttpRequest, leg: &'static str) -> Result<HttpResponse, Error> {
        let response = self.send(request).await?;
        if response.is_success() {
            return Ok(response);
        }
        tracing::debug!(leg, status = response.status, url = %response.url, "Leg failed");
        Err(Error::Http {
            status: response.status,
            status_text: response.status_text,
        })
    }
}

/// Appends `key=value` to a caller-supplied endpoint, if a value is given.
fn with_param(endpoint: &str, key: &str, value: Option<&str>) -> Result<String, Error> {
    let mut url: Url = endpoint
        .parse()
        .map_err(|e| Error::Config(format!("invalid endpoint {endpoint}: {e}")))?;
    if let Some(value) = value {
        url.query_pairs_mut().append_pair(key, value);
    }
    Ok(url.into())
}
