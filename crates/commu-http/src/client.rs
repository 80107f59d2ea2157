//! HTTP transport for the Commu REST API.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};

use commu_core::error::{AuthError, ProtocolError, TransportError};
use commu_core::{AccessToken, ApiResponse, ApiUrl, Error, PaginationMeta, Result};

/// Request timeout unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client bound to one API base URL.
///
/// Clones share the connection pool and the access token.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: ApiUrl,
    token: Arc<RwLock<Option<AccessToken>>>,
}

impl ApiClient {
    /// Create a client for `base` with the default timeout.
    pub fn new(base: ApiUrl) -> Result<Self> {
        Self::with_timeout(base, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base: ApiUrl, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("commu/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            client,
            base,
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn base(&self) -> &ApiUrl {
        &self.base
    }

    /// Attach `token` to every following request, or stop sending one.
    pub fn set_token(&self, token: Option<AccessToken>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// `GET path?query`, returning the data and pagination metadata.
    #[instrument(skip(self, query), fields(base = %self.base))]
    pub async fn get<R>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(R, Option<PaginationMeta>)>
    where
        R: DeserializeOwned,
    {
        trace!(?query, "query parameters");
        let request = self.request(Method::GET, path).query(query);
        self.send(path, request).await
    }

    /// `POST path` with a JSON body.
    #[instrument(skip(self, body), fields(base = %self.base))]
    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.request(Method::POST, path).json(body);
        self.send(path, request).await.map(|(data, _)| data)
    }

    /// `POST path` without a body.
    #[instrument(skip(self), fields(base = %self.base))]
    pub async fn post_empty<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let request = self.request(Method::POST, path);
        self.send(path, request).await.map(|(data, _)| data)
    }

    #[instrument(skip(self), fields(base = %self.base))]
    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let request = self.request(Method::DELETE, path);
        self.send(path, request).await.map(|(data, _)| data)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.base.endpoint(path);
        debug!(%method, %url, "API request");

        let mut request = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(token) = &*self.token.read().unwrap_or_else(PoisonError::into_inner) {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token.as_str()));
        }
        request
    }

    async fn send<R: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<(R, Option<PaginationMeta>)> {
        let response = request.send().await.map_err(transport_error)?;
        self.handle_response(path, response).await
    }

    /// Decode the envelope, mapping error statuses.
    async fn handle_response<R: DeserializeOwned>(
        &self,
        path: &str,
        response: Response,
    ) -> Result<(R, Option<PaginationMeta>)> {
        let status = response.status();
        trace!(%status, "API response");
        let body = response.bytes().await.map_err(transport_error)?;

        if status.is_success() {
            let envelope: ApiResponse<R> =
                serde_json::from_slice(&body).map_err(|err| TransportError::Decode {
                    message: err.to_string(),
                })?;
            return envelope.into_parts(status.as_u16());
        }

        let error = parse_error(status, &body);
        match status {
            StatusCode::UNAUTHORIZED => {
                debug!(%error, "request rejected as unauthenticated");
                if self.has_token() {
                    Err(AuthError::SessionExpired.into())
                } else {
                    Err(AuthError::NotLoggedIn.into())
                }
            }
            StatusCode::NOT_FOUND => Err(Error::not_found(
                error.message.unwrap_or_else(|| path.to_string()),
            )),
            _ => Err(error.into()),
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base)
            .field("token", &self.has_token().then_some("[REDACTED]"))
            .finish()
    }
}

/// Read the failure envelope of an error response, if there is one.
pub(crate) fn parse_error(status: StatusCode, body: &[u8]) -> ProtocolError {
    match serde_json::from_slice::<ApiResponse<serde_json::Value>>(body) {
        Ok(ApiResponse::Failure { code, message }) => {
            ProtocolError::new(status.as_u16(), code, message)
        }
        _ => ProtocolError::new(status.as_u16(), None, None),
    }
}

/// Map a reqwest failure onto the transport error kinds.
pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    let transport = if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else if err.is_decode() {
        TransportError::Decode {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    transport.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let base = ApiUrl::new("http://localhost:3000/api").unwrap();
        let client = ApiClient::new(base.clone()).unwrap();
        assert_eq!(client.base(), &base);
        assert!(!client.has_token());

        client.set_token(Some(AccessToken::new("secret")));
        assert!(client.has_token());
        assert!(!format!("{:?}", client).contains("secret"));
    }

    #[test]
    fn failure_envelope_is_parsed() {
        let body = br#"{"success":false,"error":{"code":"VALIDATION","message":"too short"}}"#;
        let error = parse_error(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert_eq!(error.status, 422);
        assert_eq!(error.code.as_deref(), Some("VALIDATION"));
        assert_eq!(error.message.as_deref(), Some("too short"));

        let error = parse_error(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>");
        assert_eq!(error.status, 502);
        assert!(error.code.is_none());
    }
}
