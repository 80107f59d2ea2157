//! The REST response envelope.
//!
//! Every backend response is wrapped as
//! `{ "success": bool, "data"?: T, "meta"?: PaginationMeta, "error"?: ... }`.
//! [`ApiResponse`] models that shape as a sum type so both branches are
//! handled explicitly instead of relying on "returns or throws".

use serde::{Deserialize, Deserializer};

use crate::error::{Error, ProtocolError};
use crate::page::PaginationMeta;

/// A decoded response envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    /// `success: true`.
    Success {
        data: T,
        meta: Option<PaginationMeta>,
    },
    /// `success: false`.
    Failure {
        code: Option<String>,
        message: Option<String>,
    },
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success { .. })
    }

    /// Split a successful envelope into data and pagination metadata.
    ///
    /// `status` is the HTTP status the envelope arrived with and is carried
    /// into the protocol error of a failure envelope.
    pub fn into_parts(self, status: u16) -> Result<(T, Option<PaginationMeta>), Error> {
        match self {
            ApiResponse::Success { data, meta } => Ok((data, meta)),
            ApiResponse::Failure { code, message } => {
                Err(ProtocolError::new(status, code, message).into())
            }
        }
    }

    /// Like [`into_parts`](Self::into_parts), discarding the metadata.
    pub fn into_data(self, status: u16) -> Result<T, Error> {
        self.into_parts(status).map(|(data, _)| data)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireError {
    Detailed {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    Plain(String),
}

#[derive(Deserialize)]
struct RawEnvelope<T> {
    success: bool,
    data: Option<T>,
    #[serde(default)]
    meta: Option<PaginationMeta>,
    #[serde(default)]
    error: Option<WireError>,
    #[serde(default)]
    message: Option<String>,
}

impl<'de, T> Deserialize<'de> for ApiResponse<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawEnvelope::<T>::deserialize(deserializer)?;

        if !raw.success {
            let (code, message) = match raw.error {
                Some(WireError::Detailed { code, message }) => (code, message.or(raw.message)),
                Some(WireError::Plain(message)) => (None, Some(message)),
                None => (None, raw.message),
            };
            return Ok(ApiResponse::Failure { code, message });
        }

        let data = match raw.data {
            Some(data) => data,
            // Unit and optional payloads may be omitted entirely.
            None => T::deserialize(serde_json::Value::Null).map_err(|_| {
                serde::de::Error::custom("successful envelope is missing 'data'")
            })?,
        };

        Ok(ApiResponse::Success {
            data,
            meta: raw.meta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_with_meta() {
        let response: ApiResponse<Vec<u32>> = serde_json::from_value(json!({
            "success": true,
            "data": [1, 2, 3],
            "meta": { "page": 1, "limit": 3, "total": 7, "totalPages": 3, "hasNextPage": true }
        }))
        .unwrap();

        let (data, meta) = response.into_parts(200).unwrap();
        assert_eq!(data, vec![1, 2, 3]);
        let meta = meta.unwrap();
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next_page);
        assert!(!meta.has_previous_page);
    }

    #[test]
    fn failure_with_detailed_error() {
        let response: ApiResponse<Vec<u32>> = serde_json::from_value(json!({
            "success": false,
            "error": { "code": "POST_NOT_FOUND", "message": "no such post" }
        }))
        .unwrap();

        assert!(!response.is_success());
        let err = response.into_data(404).unwrap_err();
        assert_eq!(err.to_string(), "protocol error: HTTP 404 [POST_NOT_FOUND]: no such post");
    }

    #[test]
    fn failure_with_plain_message() {
        let response: ApiResponse<()> = serde_json::from_value(json!({
            "success": false,
            "message": "rate limited"
        }))
        .unwrap();

        assert_eq!(
            response,
            ApiResponse::Failure {
                code: None,
                message: Some("rate limited".to_string())
            }
        );
    }

    #[test]
    fn unit_payload_may_be_omitted() {
        let response: ApiResponse<()> = serde_json::from_value(json!({ "success": true })).unwrap();
        assert!(response.into_data(200).is_ok());
    }

    #[test]
    fn missing_data_is_rejected_for_values() {
        let result = serde_json::from_value::<ApiResponse<Vec<u32>>>(json!({ "success": true }));
        assert!(result.is_err());
    }
}
