use std::time::Duration;

use liefclock_domain::constants::DEFAULT_REQUEST_TIMEOUT_MS;
use liefclock_domain::LiefClockError;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use crate::errors::InfraError;

const USER_AGENT: &str = concat!("liefclock/", env!("CARGO_PKG_VERSION"));

/// Longest pause between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// How often a request may reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Safe to repeat: connection failures and 5xx are retried.
    Idempotent,
    /// Sent exactly once. Clock mutations use this so an attempt that reached
    /// the server is never recorded twice.
    AtMostOnce,
}

/// Shared reqwest wrapper used by the GraphQL gateway and the reachability probe.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn new() -> Result<Self, LiefClockError> {
        Self::builder().build()
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Shorthand for [`Delivery::Idempotent`].
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, LiefClockError> {
        self.execute(builder, Delivery::Idempotent).await
    }

    /// Shorthand for [`Delivery::AtMostOnce`].
    pub async fn send_once(&self, builder: RequestBuilder) -> Result<Response, LiefClockError> {
        self.execute(builder, Delivery::AtMostOnce).await
    }

    /// Send the request, retrying only what `delivery` allows.
    ///
    /// Non-2xx responses are returned as-is; callers map statuses themselves.
    pub async fn execute(
        &self,
        builder: RequestBuilder,
        delivery: Delivery,
    ) -> Result<Response, LiefClockError> {
        let attempts = match delivery {
            Delivery::Idempotent => self.max_attempts,
            Delivery::AtMostOnce => 1,
        };

        let mut attempt = 1;
        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| {
                    LiefClockError::Internal("streaming request body cannot be resent".into())
                })?
                .build()
                .map_err(to_domain)?;
            let (method, url) = (request.method().clone(), request.url().clone());
            let last_attempt = attempt >= attempts;

            match self.client.execute(request).await {
                Ok(response) if response.status().is_server_error() && !last_attempt => {
                    let status = response.status();
                    debug!(attempt, %method, %url, %status, "server error; retrying");
                }
                Ok(response) => {
                    debug!(attempt, %method, %url, status = %response.status(), "HTTP response");
                    return Ok(response);
                }
                Err(err) if is_transient(&err) && !last_attempt => {
                    debug!(attempt, %method, %url, error = %err, "transport error; retrying");
                }
                Err(err) => {
                    debug!(attempt, %method, %url, error = %err, "HTTP request failed");
                    return Err(to_domain(err));
                }
            }

            tokio::time::sleep(self.backoff(attempt)).await;
            attempt += 1;
        }
    }

    /// Exponential backoff after the given (1-based) attempt.
    fn backoff(&self, attempt: usize) -> Duration {
        let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(8);
        self.base_backoff.saturating_mul(1 << exponent).min(MAX_BACKOFF)
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts for idempotent requests (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn build(self) -> Result<HttpClient, LiefClockError> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()
            .map_err(to_domain)?;

        Ok(HttpClient { client, max_attempts: self.max_attempts, base_backoff: self.base_backoff })
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

fn to_domain(err: reqwest::Error) -> LiefClockError {
    LiefClockError::from(InfraError::from(err))
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use reqwest::StatusCode;
    use wiremock::matchers::{header_regex, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn fast_client() -> HttpClient {
        HttpClient::builder()
            .base_backoff(Duration::from_millis(10))
            .max_attempts(3)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn identifies_itself_with_a_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_regex("user-agent", "^liefclock/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = fast_client();
        let response = client.send(client.request(Method::GET, server.uri())).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn idempotent_requests_retry_server_errors() {
        let server = MockServer::start().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        Mock::given(method("POST"))
            .respond_with(move |_req: &wiremock::Request| {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    ResponseTemplate::new(502)
                } else {
                    ResponseTemplate::new(200)
                }
            })
            .expect(3)
            .mount(&server)
            .await;

        let client = fast_client();
        let query = client
            .request(Method::POST, server.uri())
            .body(r#"{"query":"{ shifts { id } }"}"#);
        let response = client.execute(query, Delivery::Idempotent).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn at_most_once_returns_the_first_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = fast_client();
        let mutation = client
            .request(Method::POST, server.uri())
            .body(r#"{"operationName":"ClockIn"}"#);
        let response = client.send_once(mutation).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn client_errors_are_returned_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = fast_client();
        let response = client.send(client.request(Method::GET, server.uri())).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpClient::builder()
            .base_backoff(Duration::from_millis(5))
            .max_attempts(2)
            .build()
            .unwrap();
        let result = client.send(client.request(Method::GET, format!("http://{addr}"))).await;

        assert!(matches!(result, Err(LiefClockError::Network(_))), "got {result:?}");
    }

    #[test]
    fn backoff_doubles_and_is_capped() {
        let client =
            HttpClient::builder().base_backoff(Duration::from_millis(100)).build().unwrap();

        assert_eq!(client.backoff(1), Duration::from_millis(100));
        assert_eq!(client.backoff(3), Duration::from_millis(400));
        assert_eq!(client.backoff(20), MAX_BACKOFF);
    }
}
