//! Shared JSON client for the feed APIs
//!
//! Adds the API key header to every call and applies the retry policy:
//! a client-error or 503 status is retried once after a fixed delay.
//! Transport failures are returned as-is.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PublishError, PublishResult};

/// Longest server error body kept in a [`PublishError`]
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth_header: &'static str,
    api_key: String,
    retry_delay: Duration,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        auth_header: &'static str,
        api_key: &str,
        retry_delay: Duration,
        timeout: Duration,
    ) -> PublishResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
            api_key: api_key.to_string(),
            retry_delay,
        })
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> PublishResult<T> {
        let response = self.execute::<()>(Method::GET, url, None).await?;
        decode(response).await
    }

    pub async fn send_json<B, T>(&self, method: Method, url: &str, body: &B) -> PublishResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.execute(method, url, Some(body)).await?;
        decode(response).await
    }

    /// Send and discard the response body.
    pub async fn send<B>(&self, method: Method, url: &str, body: &B) -> PublishResult<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.execute(method, url, Some(body)).await?;
        Ok(())
    }

    async fn execute<B>(&self, method: Method, url: &str, body: Option<&B>) -> PublishResult<Response>
    where
        B: Serialize + ?Sized + Sync,
    {
        let mut retried = false;

        loop {
            let mut request = self
                .http
                .request(method.clone(), url)
                .header(self.auth_header, &self.api_key)
                .header(ACCEPT, "application/json");
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if !retried && is_retryable(status) {
                tracing::debug!(
                    "{} {} returned {}, retrying in {:?}",
                    method,
                    url,
                    status,
                    self.retry_delay
                );
                retried = true;
                tokio::time::sleep(self.retry_delay).await;
                continue;
            }

            let mut body = response.text().await.unwrap_or_default();
            if body.len() > ERROR_BODY_LIMIT {
                let mut end = ERROR_BODY_LIMIT;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            return Err(PublishError::Server {
                status: status.as_u16(),
                body,
            });
        }
    }
}

/// Client errors (quota, auth, rate limit) and 503 get one retry.
fn is_retryable(status: StatusCode) -> bool {
    status.is_client_error() || status == StatusCode::SERVICE_UNAVAILABLE
}

async fn decode<T: DeserializeOwned>(response: Response) -> PublishResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| PublishError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(
            &server.uri(),
            "x-apikey",
            "k3y",
            Duration::from_millis(10),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn retry_policy() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::FORBIDDEN));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_retryable(StatusCode::BAD_GATEWAY));
    }

    #[tokio::test]
    async fn retries_once_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .and(header("x-apikey", "k3y"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server);
        let value: Value = api.get_json(&api.url("/thing")).await.unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[tokio::test]
    async fn gives_up_after_one_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(403).set_body_string("quota exceeded"))
            .expect(2)
            .mount(&server)
            .await;

        let api = client(&server);
        let err = api.send(Method::POST, &api.url("/thing"), &json!({})).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn server_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server);
        let err = api.get_json::<Value>(&api.url("/thing")).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let api = ApiClient::new(
            "http://127.0.0.1:9",
            "x-apikey",
            "k3y",
            Duration::from_millis(10),
            Duration::from_secs(2),
        )
        .unwrap();

        let err = api.get_json::<Value>(&api.url("/thing")).await.unwrap_err();
        assert!(matches!(err, PublishError::Network(_)));
    }
}
