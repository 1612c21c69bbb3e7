//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client that identifies itself with a fixed forwarded IP
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Sent as `X-Forwarded-For`; `None` sends no header
    pub client_ip: Option<String>,
}

/// Builds a compose/generate body from `(charm_name, stage)` pairs.
pub fn traits_body(traits: &[(&str, i64)], duration_seconds: Option<u32>) -> Value {
    let traits: Vec<Value> = traits
        .iter()
        .map(|(name, stage)| json!({"charm_name": name, "stage": stage}))
        .collect();
    let mut body = json!({ "constellation": { "traits": traits } });
    if let Some(duration) = duration_seconds {
        body["context"] = json!({ "duration_seconds": duration });
    }
    body
}

impl TestClient {
    /// Creates a client using `TEST_CLIENT_IP`
    pub fn new(base_url: String) -> Self {
        Self::with_ip(base_url, TEST_CLIENT_IP)
    }

    /// Creates a client that reports the given address
    pub fn with_ip(base_url: String, ip: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            client_ip: Some(ip.to_string()),
        }
    }

    /// Creates a client that sends no forwarding headers, so the socket
    /// address identifies it
    pub fn direct(base_url: String) -> Self {
        let mut client = Self::new(base_url);
        client.client_ip = None;
        client
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.with_identity(self.client.get(format!("{}{}", self.base_url, path)))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.with_identity(self.client.post(format!("{}{}", self.base_url, path)))
    }

    fn with_identity(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.client_ip {
            Some(ip) => request.header("X-Forwarded-For", ip.as_str()),
            None => request,
        }
    }

    // ========================================================================
    // Service Endpoints
    // ========================================================================

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.get("/").send().await.expect("Home request failed")
    }

    /// GET /healthz
    pub async fn get_healthz(&self) -> Response {
        self.get("/healthz").send().await.expect("Healthz request failed")
    }

    /// GET /debugz
    pub async fn get_debugz(&self) -> Response {
        self.get("/debugz").send().await.expect("Debugz request failed")
    }

    // ========================================================================
    // API Endpoints
    // ========================================================================

    /// GET /v1/charms
    pub async fn get_charms(&self) -> Response {
        self.get("/v1/charms")
            .send()
            .await
            .expect("Get charms request failed")
    }

    /// GET /v1/usage
    pub async fn get_usage(&self) -> Response {
        self.get("/v1/usage")
            .send()
            .await
            .expect("Get usage request failed")
    }

    /// POST /v1/compose
    pub async fn compose(&self, body: &Value) -> Response {
        self.post("/v1/compose")
            .json(body)
            .send()
            .await
            .expect("Compose request failed")
    }

    /// POST /v1/compose with the given charms
    pub async fn compose_traits(&self, traits: &[(&str, i64)], duration: Option<u32>) -> Response {
        self.compose(&traits_body(traits, duration)).await
    }

    /// POST /v1/generate
    pub async fn generate(&self, body: &Value) -> Response {
        self.post("/v1/generate")
            .json(body)
            .send()
            .await
            .expect("Generate request failed")
    }

    /// POST /v1/generate with the given charms
    pub async fn generate_traits(
        &self,
        traits: &[(&str, i64)],
        duration: Option<u32>,
    ) -> Response {
        self.generate(&traits_body(traits, duration)).await
    }
}
