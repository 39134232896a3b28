use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::session::AuthenticationSession;
use crate::transport::HttpResponse;

/// Separator between the remembered vfp and the wrapped body of a POST flow.
pub const COMBINED_TOKEN_SEPARATOR: &str = "___";

/// What to do after an auth-leg response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Interpretation {
    /// Chase the redirect to this absolute URL.
    Follow(String),
    /// The finish token is known (also stored as the session's `final_vfp`).
    Extracted(String),
}

#[derive(Deserialize)]
struct VfpBody {
    #[serde(default)]
    vfp: Option<String>,
}

/// Interprets the response to the last dispatched auth call.
///
/// # Errors
///
/// - [`Error::Http`] for a non-200 response without a `Location` header,
///   including other 2xx codes such as 204: only 200 carries a token
/// - [`Error::NoData`] for an empty 200 in the POST flow
/// - [`Error::MissingVfp`] when the GET flow yields no token
/// - [`Error::Parse`] for a GET-flow body that is not `{"vfp": ...}`
pub(crate) fn interpret(
    session: &mut AuthenticationSession,
    response: &HttpResponse,
) -> Result<Interpretation, Error> {
    if response.status != 200 {
        let location = response
            .location
            .as_deref()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| Error::Http {
                status: response.status,
                status_text: response.status_text.clone(),
            })?;
        return Ok(Interpretation::Follow(resolve(&session.target_url, location)));
    }

    let token = match (session.is_post_flow, response.body.is_empty()) {
        (true, true) => return Err(Error::NoData),
        (true, false) => combined_token(session.vfp.as_deref().unwrap_or_default(), &response.body),
        (false, true) => vfp_from_urls(session, response).ok_or(Error::MissingVfp)?,
        (false, false) => {
            let body: VfpBody = serde_json::from_slice(&response.body)
                .map_err(|e| Error::parse("auth response", e))?;
            body.vfp.filter(|v| !v.is_empty()).ok_or(Error::MissingVfp)?
        }
    };

    session.final_vfp = Some(token.clone());
    Ok(Interpretation::Extracted(token))
}

/// `vfp + "___" + base64(body)`.
#[must_use]
pub fn combined_token(vfp: &str, body: &[u8]) -> String {
    format!("{vfp}{COMBINED_TOKEN_SEPARATOR}{}", STANDARD.encode(body))
}

/// Resolves a `Location` value against the URL that produced it.
fn resolve(base: &str, location: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(location))
        .map_or_else(|_| location.to_owned(), String::from)
}

/// GET flow with an empty body: the token rides on a URL instead.
fn vfp_from_urls(session: &AuthenticationSession, response: &HttpResponse) -> Option<String> {
    response
        .location
        .as_deref()
        .and_then(|l| query_vfp(&resolve(&session.target_url, l)))
        .or_else(|| query_vfp(&response.url))
        .or_else(|| session.vfp.clone())
}

fn query_vfp(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "vfp")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}
