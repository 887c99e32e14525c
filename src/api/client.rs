//! REST client for the GutWise backend.

use std::time::Duration;

use gutwise_core::{Pattern, SyncAction, SyncQueueItem};
use reqwest::RequestBuilder;

use super::error::ApiError;
use crate::config::SyncConfig;

/// Path of the reachability endpoint.
const HEALTH_PATH: &str = "/health";

/// Client for the backend's REST API. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    api_url: String,
    api_token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    /// Creates a new client with explicit parameters.
    pub fn new(api_url: impl Into<String>, api_token: Option<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_token,
            http: reqwest::Client::new(),
        }
    }

    /// Creates a client from the `sync` config section.
    pub fn from_config(config: &SyncConfig) -> Result<Self, ApiError> {
        let url = config.api_url.as_ref().ok_or(ApiError::NotConfigured)?;
        Ok(Self::new(url.clone(), config.api_token.clone()))
    }

    /// Returns the API base URL.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Delivers one queued mutation.
    ///
    /// Returns `Ok(true)` on a 2xx response and `Ok(false)` on any other
    /// status. Transport failures are returned as errors.
    pub async fn send_item(&self, item: &SyncQueueItem) -> Result<bool, ApiError> {
        let collection = item.kind.collection();

        let request = match item.action {
            SyncAction::Create => self
                .http
                .post(self.build_url(&format!("/{}", collection)))
                .json(&item.payload),
            SyncAction::Update => self
                .http
                .patch(self.record_url(item)?)
                .json(&item.payload),
            SyncAction::Delete => self.http.delete(self.record_url(item)?),
        };

        let response = self.authorized(request).send().await?;
        let status = response.status();

        if status.is_success() {
            tracing::debug!("Delivered {}", item);
            Ok(true)
        } else {
            tracing::debug!("Server rejected {} with status {}", item, status);
            Ok(false)
        }
    }

    /// Fetches the user's current patterns.
    pub async fn fetch_patterns(&self) -> Result<Vec<Pattern>, ApiError> {
        let request = self.http.get(self.build_url("/patterns"));
        let response = self.authorized(request).send().await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        Ok(response.json().await?)
    }

    /// Returns whether the backend answers its health endpoint within
    /// `timeout`.
    pub async fn check_server(&self, timeout: Duration) -> bool {
        let request = self
            .http
            .get(self.build_url(HEALTH_PATH))
            .timeout(timeout);

        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Health check against {} failed: {}", self.api_url, e);
                false
            }
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn record_url(&self, item: &SyncQueueItem) -> Result<String, ApiError> {
        let id = item
            .record_id()
            .ok_or_else(|| ApiError::MissingRecordId(format!("{} {}", item.action, item.kind)))?;
        Ok(self.build_url(&format!(
            "/{}/{}",
            item.kind.collection(),
            urlencoding::encode(id)
        )))
    }

    /// Builds an HTTP URL for a given path.
    fn build_url(&self, path: &str) -> String {
        let base_url = if !self.api_url.starts_with("http://")
            && !self.api_url.starts_with("https://")
        {
            format!("http://{}", self.api_url)
        } else {
            self.api_url.clone()
        };

        format!("{}{}", base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gutwise_core::SyncKind;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(kind: SyncKind, action: SyncAction, payload: serde_json::Value) -> SyncQueueItem {
        SyncQueueItem::new(kind, action, payload, Utc::now())
    }

    #[test]
    fn test_build_url() {
        let client = ApiClient::new("http://localhost:8080/", None);
        assert_eq!(client.build_url("/meals"), "http://localhost:8080/meals");

        let client = ApiClient::new("https://api.example.com", None);
        assert_eq!(client.build_url("/health"), "https://api.example.com/health");

        let client = ApiClient::new("localhost:8080", None);
        assert_eq!(client.build_url("/meals"), "http://localhost:8080/meals");
    }

    #[test]
    fn test_record_url_encodes_id() {
        let client = ApiClient::new("http://localhost", None);
        let update = item(SyncKind::Meal, SyncAction::Update, json!({ "id": "a b/c" }));
        assert_eq!(
            client.record_url(&update).unwrap(),
            "http://localhost/meals/a%20b%2Fc"
        );
    }

    #[test]
    fn test_from_config_requires_url() {
        assert!(matches!(
            ApiClient::from_config(&SyncConfig::default()),
            Err(ApiError::NotConfigured)
        ));

        let config = SyncConfig {
            api_url: Some("http://localhost:8080".to_string()),
            ..SyncConfig::default()
        };
        assert_eq!(
            ApiClient::from_config(&config).unwrap().api_url(),
            "http://localhost:8080"
        );
    }

    #[tokio::test]
    async fn test_create_posts_payload_with_token() {
        let server = MockServer::start().await;
        let payload = json!({ "id": "m1", "mood": 4 });

        Mock::given(method("POST"))
            .and(path("/meals"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(payload.clone()))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), Some("secret".to_string()));
        let sent = client
            .send_item(&item(SyncKind::Meal, SyncAction::Create, payload))
            .await
            .unwrap();
        assert!(sent);
    }

    #[tokio::test]
    async fn test_update_and_delete_target_record() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/symptoms/s1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/patterns/p1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), None);
        let update = item(SyncKind::Symptom, SyncAction::Update, json!({ "id": "s1", "severity": 2 }));
        let delete = item(SyncKind::Pattern, SyncAction::Delete, json!({ "id": "p1" }));

        assert!(client.send_item(&update).await.unwrap());
        assert!(client.send_item(&delete).await.unwrap());
    }

    #[tokio::test]
    async fn test_non_success_status_is_not_delivered() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/meals"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), None);
        let sent = client
            .send_item(&item(SyncKind::Meal, SyncAction::Create, json!({ "id": "m1" })))
            .await
            .unwrap();
        assert!(!sent);
    }

    #[tokio::test]
    async fn test_delete_without_id_is_an_error() {
        let client = ApiClient::new("http://localhost:1", None);
        let result = client
            .send_item(&item(SyncKind::Meal, SyncAction::Delete, json!({})))
            .await;
        assert!(matches!(result, Err(ApiError::MissingRecordId(_))));
    }

    #[tokio::test]
    async fn test_transport_failure_is_an_error() {
        // Nothing listens on port 1
        let client = ApiClient::new("http://127.0.0.1:1", None);
        let result = client
            .send_item(&item(SyncKind::Meal, SyncAction::Create, json!({ "id": "m1" })))
            .await;
        assert!(matches!(result, Err(ApiError::Http(_))));
    }

    #[tokio::test]
    async fn test_check_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), None);
        assert!(client.check_server(Duration::from_secs(2)).await);

        let offline = ApiClient::new("http://127.0.0.1:1", None);
        assert!(!offline.check_server(Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_fetch_patterns() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/patterns"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "p1",
                "userId": "u1",
                "type": "correlation",
                "trigger": "dairy",
                "response": "bloating",
                "confidence": 0.82,
                "occurrences": 6,
                "firstSeen": "2025-01-01T00:00:00Z",
                "lastSeen": "2025-02-01T00:00:00Z"
            }])))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), None);
        let patterns = client.fetch_patterns().await.unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].trigger, "dairy");
    }

    #[tokio::test]
    async fn test_fetch_patterns_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/patterns"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), None);
        assert!(matches!(
            client.fetch_patterns().await,
            Err(ApiError::Status(status)) if status.as_u16() == 503
        ));
    }
}
