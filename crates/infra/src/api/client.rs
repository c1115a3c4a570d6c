//! GraphQL gateway for the clock mutations and the shift query
//!
//! Mutations are sent exactly once; the shift query is idempotent and goes
//! through the retrying transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use liefclock_core::ClockGateway;
use liefclock_domain::{ClockPayload, Result as DomainResult, ServerConfig, Shift, ShiftRef};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::auth::{AccessTokenProvider, StaticTokenProvider};
use super::errors::ApiError;
use super::operations::{
    ClockInData, ClockOutData, ClockVariables, GraphQlRequest, GraphQlResponse, ShiftsData,
    CLOCK_IN, CLOCK_OUT, MY_SHIFTS,
};
use crate::http::{Delivery, HttpClient};

/// Configuration for the GraphQL client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Server origin, e.g. `https://clock.example.com`
    pub base_url: String,
    pub graphql_path: String,
    /// Timeout for a single request
    pub timeout: Duration,
}

impl ApiClientConfig {
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.graphql_path)
    }
}

impl From<&ServerConfig> for ApiClientConfig {
    fn from(server: &ServerConfig) -> Self {
        Self {
            base_url: server.base_url.clone(),
            graphql_path: server.graphql_path.clone(),
            timeout: server.request_timeout(),
        }
    }
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

/// GraphQL client implementing [`ClockGateway`].
pub struct ApiClient {
    http_client: HttpClient,
    auth: Option<Arc<dyn AccessTokenProvider>>,
    config: ApiClientConfig,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be created
    pub fn new(
        config: ApiClientConfig,
        auth: Option<Arc<dyn AccessTokenProvider>>,
    ) -> Result<Self, ApiError> {
        let http_client = HttpClient::builder()
            .timeout(config.timeout)
            .max_attempts(3)
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HttpClient: {}", e)))?;

        Ok(Self { http_client, auth, config })
    }

    /// Build a client from the server section, using its static token if set.
    pub fn from_server_config(server: &ServerConfig) -> Result<Self, ApiError> {
        let auth = server
            .access_token
            .clone()
            .map(|token| Arc::new(StaticTokenProvider::new(token)) as Arc<dyn AccessTokenProvider>);
        Self::new(ApiClientConfig::from(server), auth)
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// Post one GraphQL operation and unwrap its `data`.
    #[instrument(skip_all, fields(operation = %operation_name))]
    async fn execute<V, T>(
        &self,
        operation_name: &str,
        query: &str,
        variables: V,
        delivery: Delivery,
    ) -> Result<T, ApiError>
    where
        V: Serialize + Send,
        T: DeserializeOwned + Send,
    {
        let url = self.config.endpoint();
        let body = GraphQlRequest { operation_name, query, variables };

        let mut request = self
            .http_client
            .request(Method::POST, &url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(auth) = &self.auth {
            let token = auth.access_token().await?;
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        debug!(url = %url, "GraphQL request");

        let send = self.http_client.execute(request, delivery);
        let response = match tokio::time::timeout(self.config.timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(ApiError::from(err)),
            Err(_) => return Err(ApiError::Timeout(self.config.timeout)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status_error(status, &url, body));
        }

        let envelope: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| ApiError::Client(format!("Failed to parse response: {}", e)))?;

        if let Some(first) = envelope.errors.into_iter().next() {
            warn!(message = %first.message, "GraphQL operation rejected");
            return Err(ApiError::GraphQl(first.message));
        }

        envelope
            .data
            .ok_or_else(|| ApiError::Client(format!("{} returned no data", operation_name)))
    }

    fn map_status_error(status: StatusCode, url: &str, body: String) -> ApiError {
        let message = if body.is_empty() {
            format!("{} returned status {}", url, status)
        } else {
            format!("{} returned status {}: {}", url, status, body)
        };

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            ApiError::Auth(message)
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            ApiError::RateLimit(message)
        } else if status.is_server_error() {
            ApiError::Server(message)
        } else if status.is_client_error() {
            ApiError::Client(message)
        } else {
            ApiError::Network(message)
        }
    }
}

#[async_trait]
impl ClockGateway for ApiClient {
    async fn clock_in(&self, payload: &ClockPayload) -> DomainResult<ShiftRef> {
        let data: ClockInData =
            self.execute("ClockIn", CLOCK_IN, ClockVariables::from(payload), Delivery::AtMostOnce)
                .await?;
        let result = data.clock_in.ok_or_else(|| ApiError::Client("clockIn returned null".into()))?;
        Ok(ShiftRef::new(result.id, result.clock_in_at))
    }

    async fn clock_out(&self, payload: &ClockPayload) -> DomainResult<ShiftRef> {
        let data: ClockOutData =
            self.execute("ClockOut", CLOCK_OUT, ClockVariables::from(payload), Delivery::AtMostOnce)
                .await?;
        let result =
            data.clock_out.ok_or_else(|| ApiError::Client("clockOut returned null".into()))?;
        Ok(ShiftRef::new(result.id, result.clock_out_at.unwrap_or_else(Utc::now)))
    }

    async fn shifts(&self) -> DomainResult<Vec<Shift>> {
        let data: ShiftsData =
            self.execute("MyShifts", MY_SHIFTS, serde_json::json!({}), Delivery::Idempotent).await?;
        Ok(data.shifts)
    }
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ApiClientConfig>,
    auth: Option<Arc<dyn AccessTokenProvider>>,
}

impl ApiClientBuilder {
    /// Set the API configuration
    pub fn config(mut self, config: ApiClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the authentication provider
    pub fn auth(mut self, auth: Arc<dyn AccessTokenProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Build the API client
    pub fn build(self) -> Result<ApiClient, ApiError> {
        ApiClient::new(self.config.unwrap_or_default(), self.auth)
    }
}

#[cfg(test)]
mod tests {
    use liefclock_domain::LiefClockError;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> ApiClient {
        let config = ApiClientConfig {
            base_url: server.uri(),
            graphql_path: "/api/graphql".into(),
            timeout: Duration::from_secs(2),
        };
        ApiClient::builder()
            .config(config)
            .auth(Arc::new(StaticTokenProvider::new("test-token")))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn clock_in_posts_mutation_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/graphql"))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_partial_json(json!({
                "operationName": "ClockIn",
                "variables": {"note": "test", "lat": 1.0, "lng": 1.0, "manualOverride": false}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"clockIn": {"id": "shift-1", "clockInAt": "2024-03-01T09:00:00Z"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let shift = client_for(&server)
            .clock_in(&ClockPayload::new(1.0, 1.0).with_note("test"))
            .await
            .unwrap();

        assert_eq!(shift.id, "shift-1");
        assert_eq!(shift.timestamp.to_rfc3339(), "2024-03-01T09:00:00+00:00");
    }

    #[tokio::test]
    async fn graphql_errors_are_server_rejections() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{"message": "No active shift"}, {"message": "ignored"}]
            })))
            .mount(&server)
            .await;

        let result = client_for(&server).clock_out(&ClockPayload::new(1.0, 1.0)).await;
        assert_eq!(result, Err(LiefClockError::ServerRejection("No active shift".into())));
    }

    #[tokio::test]
    async fn server_errors_are_network_failures_and_mutations_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).clock_in(&ClockPayload::new(1.0, 1.0)).await;
        assert!(matches!(result, Err(LiefClockError::Network(_))));
    }

    #[tokio::test]
    async fn bad_request_is_a_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad variables"))
            .mount(&server)
            .await;

        let result = client_for(&server).clock_in(&ClockPayload::new(1.0, 1.0)).await;
        assert!(matches!(result, Err(LiefClockError::ServerRejection(_))));
    }

    #[tokio::test]
    async fn shifts_query_decodes_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"operationName": "MyShifts"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"shifts": [
                    {"id": "a", "clockInAt": "2024-03-01T09:00:00Z", "clockOutAt": null,
                     "clockInLat": 1.0, "clockInLng": 2.0, "clockOutLat": null,
                     "clockOutLng": null, "clockInNote": "hi", "clockOutNote": null}
                ]}
            })))
            .mount(&server)
            .await;

        let shifts = client_for(&server).shifts().await.unwrap();
        assert_eq!(shifts.len(), 1);
        assert!(shifts[0].is_open());
        assert_eq!(shifts[0].clock_in_note.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let config = ApiClientConfig {
            base_url: server.uri(),
            graphql_path: "/api/graphql".into(),
            timeout: Duration::from_millis(200),
        };
        let client = ApiClient::new(config, None).unwrap();

        let result = client.clock_in(&ClockPayload::new(1.0, 1.0)).await;
        assert!(result.as_ref().is_err_and(|e| e.is_retryable()), "got {result:?}");
    }
}
