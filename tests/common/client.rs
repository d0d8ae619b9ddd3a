//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all notification-server endpoints.
//!
//! When API routes or request formats change, update only this file.
#![allow(dead_code)] // Not every test binary uses every method

use super::constants::*;
use reqwest::{RequestBuilder, Response};
use serde_json::json;
use std::time::Duration;

/// HTTP test client with token-based authentication
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    token: Option<String>,
}

impl TestClient {
    /// Creates a new unauthenticated client.
    ///
    /// Use this for testing that endpoints reject anonymous requests.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Creates a client authenticated as the primary test user.
    pub fn authenticated(base_url: String) -> Self {
        Self::with_token(base_url, TEST_TOKEN)
    }

    /// Creates a client authenticated with a specific token.
    pub fn with_token(base_url: String, token: &str) -> Self {
        let mut client = Self::new(base_url);
        client.token = Some(token.to_string());
        client
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.header("Authorization", token),
            None => builder,
        }
    }

    /// POST /v1/notifications
    pub async fn create_notification(&self, body: &serde_json::Value) -> Response {
        self.with_auth(
            self.client
                .post(format!("{}/v1/notifications", self.base_url)),
        )
        .json(body)
        .send()
        .await
        .expect("Create notification request failed")
    }

    /// Creates a minimal booking notification for the given user.
    pub async fn create_simple_notification(&self, user_id: &str, title: &str) -> Response {
        self.create_notification(&json!({
            "user_id": user_id,
            "kind": "booking",
            "title": title,
            "body": "test body",
        }))
        .await
    }

    /// GET /v1/notifications
    pub async fn get_notifications(&self) -> Response {
        self.with_auth(
            self.client
                .get(format!("{}/v1/notifications", self.base_url)),
        )
        .send()
        .await
        .expect("List notifications request failed")
    }

    /// GET /v1/notifications?limit=N
    pub async fn get_notifications_with_limit(&self, limit: usize) -> Response {
        self.with_auth(
            self.client
                .get(format!("{}/v1/notifications?limit={}", self.base_url, limit)),
        )
        .send()
        .await
        .expect("List notifications request failed")
    }

    /// GET /v1/notifications/unread-count
    pub async fn get_unread_count(&self) -> Response {
        self.with_auth(self.client.get(format!(
            "{}/v1/notifications/unread-count",
            self.base_url
        )))
        .send()
        .await
        .expect("Unread count request failed")
    }

    /// POST /v1/notifications/{id}/read
    pub async fn mark_notification_read(&self, notification_id: &str) -> Response {
        self.with_auth(self.client.post(format!(
            "{}/v1/notifications/{}/read",
            self.base_url, notification_id
        )))
        .send()
        .await
        .expect("Mark read request failed")
    }

    /// POST /v1/notifications/read-all
    pub async fn mark_all_notifications_read(&self) -> Response {
        self.with_auth(
            self.client
                .post(format!("{}/v1/notifications/read-all", self.base_url)),
        )
        .send()
        .await
        .expect("Mark all read request failed")
    }

    /// DELETE /v1/notifications/{id}
    pub async fn delete_notification(&self, notification_id: &str) -> Response {
        self.with_auth(self.client.delete(format!(
            "{}/v1/notifications/{}",
            self.base_url, notification_id
        )))
        .send()
        .await
        .expect("Delete notification request failed")
    }
}
