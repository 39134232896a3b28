use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::Error;

/// Identifier of one authentication attempt.
///
/// Generated fresh for every [`Authenticator::run`](crate::Authenticator::run);
/// appears in every log line emitted for that attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct SessionId(pub Ulid);

impl SessionId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

/// Body of the integrator's start endpoint.
///
/// `{status: 0, targetUrl}` on success, `{status: n, description}` otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StartResponse {
    pub status: i64,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl StartResponse {
    /// Returns the carrier URL or the vendor failure.
    pub(crate) fn into_target_url(self) -> Result<String, Error> {
        if self.status != 0 {
            return Err(Error::Vendor {
                status: self.status,
                description: self.description.unwrap_or_default(),
            });
        }
        self.target_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| Error::parse("start response", "missing field `targetUrl`"))
    }
}

/// Instruction payload carried in the `data` parameter of a `pfflow=2` URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct FlowInstruction {
    pub url: String,
    pub data: String,
    pub vfp: String,
}

/// Body of the integrator's finish endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct FinishResponse {
    pub status: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub response: Option<FinishDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct FinishDetails {
    pub mobile_number: String,
    pub mobile_operator_name: String,
    pub payfone_alias: String,
}

/// Subscriber details delivered on successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct DeviceInfo {
    /// MSISDN of the authenticated device.
    pub number: String,
    /// Mobile operator name.
    pub carrier: String,
    /// Vendor alias for the subscriber.
    pub pfid: String,
}

impl DeviceInfo {
    #[must_use]
    pub fn new(
        number: impl Into<String>,
        carrier: impl Into<String>,
        pfid: impl Into<String>,
    ) -> Self {
        Self {
            number: number.into(),
            carrier: carrier.into(),
            pfid: pfid.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_success_yields_target() {
        let start: StartResponse =
            serde_json::from_str(r#"{"status":0,"targetUrl":"http://oap7.example/auth"}"#).unwrap();
        assert_eq!(start.into_target_url().unwrap(), "http://oap7.example/auth");
    }

    #[test]
    fn start_failure_yields_vendor_error() {
        let start: StartResponse =
            serde_json::from_str(r#"{"status":12,"description":"Bad client"}"#).unwrap();
        match start.into_target_url() {
            Err(Error::Vendor {
                status,
                description,
            }) => {
                assert_eq!(status, 12);
                assert_eq!(description, "Bad client");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn start_success_without_target_is_parse_error() {
        let start: StartResponse = serde_json::from_str(r#"{"status":0}"#).unwrap();
        assert!(matches!(
            start.into_target_url(),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn finish_response_uses_pascal_case() {
        let finish: FinishResponse = serde_json::from_str(
            r#"{"Status":0,"Description":"Success.","Response":{"MobileNumber":"+15551234567","MobileOperatorName":"CarrierX","PayfoneAlias":"alias1"}}"#,
        )
        .unwrap();
        assert_eq!(finish.status, 0);
        let details = finish.response.unwrap();
        assert_eq!(details.mobile_number, "+15551234567");
        assert_eq!(details.mobile_operator_name, "CarrierX");
        assert_eq!(details.payfone_alias, "alias1");
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn session_id_serde_roundtrip() {
        let id = SessionId(Ulid::nil());
        let json = serde_json::to_string(&id).unwrap();
        let parsed: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
