//! Wire types for the `/hash` endpoint.
//!
//! Field names follow the service's public JSON contract (`ID`, `Data`,
//! `Name`, `Hash`), so both types rename their fields explicitly. The same
//! [`HashResponse`] encoding is used for the HTTP reply and for each element of
//! a published batch.

use serde::{Deserialize, Serialize};

/// Incoming request: a subject identifier and the payload to digest.
///
/// Both fields are required; a body missing either is a decode error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HashRequest {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Data")]
    pub data: String,
}

/// Joined result of a lookup and a digest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HashResponse {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Hash")]
    pub hash: String,
}

impl HashResponse {
    pub const fn new(name: String, hash: String) -> Self {
        Self { name, hash }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_capitalized_field_names() {
        let req: HashRequest = serde_json::from_str(r#"{"ID": 42, "Data": "abc"}"#).unwrap();
        assert_eq!(
            req,
            HashRequest {
                id: 42,
                data: "abc".into()
            }
        );
    }

    #[test]
    fn request_missing_data_is_rejected() {
        assert!(serde_json::from_str::<HashRequest>(r#"{"ID": 42}"#).is_err());
        assert!(serde_json::from_str::<HashRequest>(r#"{"id": 42, "data": "x"}"#).is_err());
    }

    #[test]
    fn response_serializes_name_then_hash() {
        let resp = HashResponse::new("alice".into(), "AAAA".into());
        assert_eq!(
            serde_json::to_string(&resp).unwrap(),
            r#"{"Name":"alice","Hash":"AAAA"}"#
        );
    }
}
