//! # HTTP Retrieval Utilities
//!
//! This module provides an asynchronous API client wrapper around `reqwest`
//! with bounded timeouts and standardized JSON response handling. Non-2xx
//! answers are returned as data (`success == false`); only failures to get an
//! answer at all become a `RetrieveError`.

use reqwest::{
    header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE},
    Method, Url,
};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Ways a request can fail before a usable response exists.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RetrieveError {
    /// The base URL or joined path is not a valid absolute URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The underlying `reqwest` client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Build(String),

    /// No response (or body) arrived within the configured bound.
    #[error("Request timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    /// The connection could not be established.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// A 2xx body could not be deserialized into the requested type.
    #[error("Failed to decode response body: {0}")]
    Decode(String),

    /// Any other transport failure.
    #[error("Request failed: {0}")]
    Other(String),
}

impl RetrieveError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        // Connect timeouts report both is_timeout and is_connect.
        if err.is_timeout() {
            RetrieveError::Timeout(timeout)
        } else if err.is_connect() {
            RetrieveError::Connect(err.to_string())
        } else if err.is_decode() {
            RetrieveError::Decode(err.to_string())
        } else if err.is_builder() {
            RetrieveError::Build(err.to_string())
        } else {
            RetrieveError::Other(err.to_string())
        }
    }
}

/// A standardized container for API responses.
///
/// This struct wraps the deserialized data along with metadata about the
/// HTTP transaction, such as status codes and headers.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The successfully deserialized response body, if any.
    pub data: Option<T>,
    /// The raw error body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

/// A flexible asynchronous HTTP client.
///
/// Handles base URLs, authentication tokens and timeouts. There is no retry
/// layer: every call makes exactly one attempt.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// The underlying client, configured with the timeouts.
    inner: reqwest::Client,
    /// The base URL to which all relative paths are joined.
    base_url: Url,
    /// An optional Bearer token used for authorization.
    auth_token: Option<String>,
    /// Total request bound, kept for error reporting.
    timeout: Duration,
}

impl ApiClient {
    /// Creates a new `ApiClient`.
    ///
    /// # Arguments
    /// * `base_url` - The absolute base URL for the API (e.g., "https://pokeapi.co/").
    /// * `auth_token` - An optional string for the Authorization header.
    /// * `timeout` - Bound applied both to connecting and to the whole request.
    ///
    /// # Errors
    /// `RetrieveError::InvalidUrl` if `base_url` is not absolute, or
    /// `RetrieveError::Build` if the TLS backend cannot be initialised.
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RetrieveError> {
        let mut url = Url::parse(base_url)
            .map_err(|e| RetrieveError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if url.cannot_be_a_base() {
            return Err(RetrieveError::InvalidUrl(format!("{} cannot be a base URL", base_url)));
        }
        // Without a trailing slash, join() would replace the last segment.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RetrieveError::Build(e.to_string()))?;

        Ok(Self {
            inner: client,
            base_url: url,
            auth_token,
            timeout,
        })
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The bound applied to each request.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Joins `path` onto the base URL.
    pub fn url_for(&self, path: &str) -> Result<Url, RetrieveError> {
        self.base_url
            .join(path)
            .map_err(|e| RetrieveError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Performs a generic HTTP request and handles the response.
    ///
    /// # Arguments
    /// * `method` - The HTTP verb (GET, POST, etc.).
    /// * `path` - The relative path to append to the base URL.
    /// * `headers` - Optional additional headers for this specific request.
    /// * `body` - Optional serializable object to send as the JSON body.
    ///
    /// # Errors
    /// A `RetrieveError` when no response could be obtained, or when a 2xx
    /// body does not deserialize into `T`.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        headers: Option<HeaderMap>,
        body: Option<B>,
    ) -> Result<ApiResponse<T>, RetrieveError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let full_url = self.url_for(path)?;
        let mut req = self.inner.request(method, full_url);

        if let Some(h) = headers {
            req = req.headers(h);
        }

        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        if let Some(b) = body {
            let json_body =
                serde_json::to_string(&b).map_err(|e| RetrieveError::Other(e.to_string()))?;
            req = req.header(CONTENT_TYPE, "application/json").body(json_body);
        }

        let response = req
            .send()
            .await
            .map_err(|e| RetrieveError::from_reqwest(e, self.timeout))?;
        let status = response.status();
        let resp_headers = response.headers().clone();

        if status.is_success() {
            let data = response
                .json::<T>()
                .await
                .map_err(|e| RetrieveError::from_reqwest(e, self.timeout))?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers: resp_headers,
            })
        } else {
            // Keep the error body for diagnostics; failing to read it is not fatal.
            let error_text = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body: error_text,
                status: status.as_u16(),
                success: false,
                headers: resp_headers,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers exactly one request with the given status line and body.
    async fn respond_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let response = format!(
                concat!(
                    "HTTP/1.1 {}\r\n",
                    "content-type: application/json\r\n",
                    "content-length: {}\r\n",
                    "connection: close\r\n\r\n{}"
                ),
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}", addr)
    }

    #[test]
    fn base_url_gets_a_trailing_slash() {
        let api =
            ApiClient::new("https://pokeapi.co/prefix", None, Duration::from_secs(1)).unwrap();
        assert_eq!(api.base_url().as_str(), "https://pokeapi.co/prefix/");
        assert_eq!(
            api.url_for("api/v2/pokemon/3/").unwrap().as_str(),
            "https://pokeapi.co/prefix/api/v2/pokemon/3/"
        );
    }

    #[test]
    fn relative_base_url_is_rejected() {
        let err = ApiClient::new("pokeapi.co", None, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, RetrieveError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn success_is_deserialized() {
        let base = respond_once("200 OK", r#"{"id":3,"name":"venusaur"}"#).await;
        let api = ApiClient::new(&base, None, Duration::from_secs(5)).unwrap();

        let res = api
            .request::<serde_json::Value, ()>(Method::GET, "api/v2/pokemon/3/", None, None)
            .await
            .unwrap();

        assert!(res.success);
        assert_eq!(res.status, 200);
        assert_eq!(res.data.unwrap()["name"], "venusaur");
    }

    #[tokio::test]
    async fn non_success_status_is_returned_not_raised() {
        let base = respond_once("404 Not Found", "\"Not Found\"").await;
        let api = ApiClient::new(&base, None, Duration::from_secs(5)).unwrap();

        let res = api
            .request::<serde_json::Value, ()>(Method::GET, "missing", None, None)
            .await
            .unwrap();

        assert!(!res.success);
        assert_eq!(res.status, 404);
        assert!(res.data.is_none());
        assert_eq!(res.error_body.as_deref(), Some("\"Not Found\""));
    }

    #[tokio::test]
    async fn invalid_json_on_success_is_a_decode_error() {
        let base = respond_once("200 OK", "not json").await;
        let api = ApiClient::new(&base, None, Duration::from_secs(5)).unwrap();

        let err = api
            .request::<serde_json::Value, ()>(Method::GET, "x", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, RetrieveError::Decode(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_a_connect_error() {
        // Bind then drop to get a port nobody listens on.
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let base = format!("http://{}", addr);
        let api = ApiClient::new(&base, None, Duration::from_secs(5)).unwrap();

        let err = api
            .request::<serde_json::Value, ()>(Method::GET, "x", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, RetrieveError::Connect(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn silent_server_is_a_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });
        let base = format!("http://{}", addr);
        let api = ApiClient::new(&base, None, Duration::from_millis(200)).unwrap();

        let err = api
            .request::<serde_json::Value, ()>(Method::GET, "x", None, None)
            .await
            .unwrap_err();

        assert_eq!(err, RetrieveError::Timeout(Duration::from_millis(200)));
    }
}
