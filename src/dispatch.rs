//! Auth-leg request construction.
//!
//! A carrier URL carrying `pfflow=2` holds a base64url JSON instruction
//! `{url, data, vfp}` and is answered with a credentialed POST of `data` to
//! `url`. Any other URL is fetched with a GET, tagged with `r=f`.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use url::Url;

use crate::error::Error;
use crate::session::AuthenticationSession;
use crate::transport::HttpRequest;
use crate::types::FlowInstruction;

const POST_FLOW: &str = "2";

/// Standard alphabet, padding optional: carriers strip `=` from the payload.
const INSTRUCTION_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decides the method of the next auth call and records the decision on the
/// session.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the target URL or its POST instruction cannot
/// be decoded.
pub(crate) fn dispatch(session: &mut AuthenticationSession) -> Result<HttpRequest, Error> {
    let target = Url::parse(&session.target_url).map_err(|e| Error::parse("auth url", e))?;

    let mut flow = None;
    let mut data = None;
    let mut vfp = None;
    for (key, value) in target.query_pairs() {
        match key.as_ref() {
            "pfflow" => flow = Some(value.into_owned()),
            "data" => data = Some(value.into_owned()),
            "vfp" => vfp = Some(value.into_owned()),
            _ => {}
        }
    }

    if flow.as_deref() == Some(POST_FLOW) {
        let encoded = data.ok_or_else(|| Error::parse("auth url", "missing `data` parameter"))?;
        let instruction = decode_instruction(&encoded)?;
        session.target_url = instruction.url.clone();
        session.vfp = Some(instruction.vfp);
        session.is_post_flow = true;
        return Ok(HttpRequest::post(instruction.url, instruction.data));
    }

    session.is_post_flow = false;
    if let Some(vfp) = vfp {
        session.vfp = Some(vfp);
    }
    Ok(HttpRequest::get(with_marker(target)))
}

/// Decodes a URL-safe base64 JSON instruction.
pub(crate) fn decode_instruction(encoded: &str) -> Result<FlowInstruction, Error> {
    let standard: String = encoded
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let raw = INSTRUCTION_ENGINE
        .decode(standard.trim())
        .map_err(|e| Error::parse("flow instruction", e))?;
    serde_json::from_slice(&raw).map_err(|e| Error::parse("flow instruction", e))
}

/// Adds `r=f` to the query, ahead of any fragment.
fn with_marker(mut url: Url) -> String {
    if let Some(query) = url.query().filter(|q| q.ends_with('&')) {
        let trimmed = query.trim_end_matches('&').to_owned();
        url.set_query(Some(&trimmed));
    }
    url.query_pairs_mut().append_pair("r", "f");
    url.into()
}
