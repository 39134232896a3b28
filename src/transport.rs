use std::future::Future;

/// HTTP method of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outbound call issued by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
    /// Send and store cookies for this call (POST flow).
    pub with_credentials: bool,
}

impl HttpRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
            with_credentials: false,
        }
    }

    #[must_use]
    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Some(body.into()),
            with_credentials: true,
        }
    }
}

/// Response as seen by the orchestrator. Redirects are never followed by the
/// transport; a 3xx arrives here with its `Location` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
    /// `Location` header, if any.
    pub location: Option<String>,
    /// Effective URL of the response.
    pub url: String,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, lossy.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Failure to obtain any HTTP response.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Non-blocking HTTP seam used for every leg of the handshake.
///
/// Implement this to run the handshake over a custom client (a webview
/// bridge, a recording double in tests). [`ReqwestTransport`] is the default.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use reqwest::header::{CONTENT_TYPE, LOCATION};
    use reqwest::redirect::Policy;

    use super::{HttpRequest, HttpResponse, Method, Transport, TransportError};
    use crate::error::Error;

    /// [`Transport`] backed by `reqwest`.
    ///
    /// Holds two clients: a plain one, and a cookie-storing one used for
    /// credential-bearing calls. Neither follows redirects.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        plain: reqwest::Client,
        credentialed: reqwest::Client,
    }

    impl ReqwestTransport {
        /// Build both clients with redirects disabled.
        ///
        /// # Errors
        ///
        /// Returns [`Error::Client`] if the TLS backend cannot be initialised.
        pub fn new(user_agent: Option<&str>) -> Result<Self, Error> {
            let builder = || {
                let builder = reqwest::Client::builder().redirect(Policy::none());
                match user_agent {
                    Some(ua) => builder.user_agent(ua.to_owned()),
                    None => builder,
                }
            };
            Ok(Self {
                plain: builder().build()?,
                credentialed: builder().cookie_store(true).build()?,
            })
        }

        /// Use caller-provided clients (connection pool reuse, proxies).
        ///
        /// Both clients should have redirects disabled, otherwise redirect
        /// chasing never sees the intermediate hops.
        #[must_use]
        pub fn with_clients(plain: reqwest::Client, credentialed: reqwest::Client) -> Self {
            Self {
                plain,
                credentialed,
            }
        }
    }

    impl Transport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let client = if request.with_credentials {
                &self.credentialed
            } else {
                &self.plain
            };

            let builder = match request.method {
                Method::Get => client.get(&request.url),
                Method::Post => client
                    .post(&request.url)
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(request.body.unwrap_or_default()),
            };

            let response = builder
                .send()
                .await
                .map_err(|e| TransportError(e.to_string()))?;

            let status = response.status();
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let url = response.url().to_string();
            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError(e.to_string()))?;

            Ok(HttpResponse {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_owned(),
                body: body.to_vec(),
                location,
                url,
            })
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_requests_carry_no_credentials() {
        let req = HttpRequest::get("https://a.example/");
        assert_eq!(req.method, Method::Get);
        assert!(req.body.is_none());
        assert!(!req.with_credentials);
    }

    #[test]
    fn post_requests_carry_credentials_and_body() {
        let req = HttpRequest::post("https://a.example/", "payload");
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.body.as_deref(), Some("payload"));
        assert!(req.with_credentials);
    }

    #[test]
    fn success_range_is_2xx() {
        assert!(testing::response(200, "", None).is_success());
        assert!(testing::response(204, "", None).is_success());
        assert!(!testing::response(302, "", None).is_success());
        assert!(!testing::response(500, "", None).is_success());
    }

    #[cfg(feature = "reqwest")]
    #[test]
    fn reqwest_transport_builds() {
        assert!(ReqwestTransport::new(Some("carrier-auth-test")).is_ok());
    }

    #[cfg(feature = "reqwest")]
    #[tokio::test]
    async fn timeout_clients_bound_a_stalled_call() {
        use std::time::Duration;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _held = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let client = || {
            reqwest::Client::builder()
                .timeout(Duration::from_millis(200))
                .build()
                .unwrap()
        };
        let transport = ReqwestTransport::with_clients(client(), client());

        let started = std::time::Instant::now();
        let result = transport.send(HttpRequest::get(format!("http://{addr}/"))).await;
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
