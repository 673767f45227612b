//! HTTP client for end-to-end tests
//!
//! Wraps reqwest and provides one method per album endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/album{}", self.base_url, path)
    }

    pub async fn get_view(&self) -> Response {
        self.client
            .get(self.url("/view"))
            .send()
            .await
            .expect("View request failed")
    }

    pub async fn post_intent(&self, intent: Value) -> Response {
        self.client
            .post(self.url("/intent"))
            .json(&intent)
            .send()
            .await
            .expect("Intent request failed")
    }

    /// Sends an intent acting on a single item, e.g. "primary_activate"
    pub async fn item_intent(&self, intent: &str, id: u32) -> Response {
        self.post_intent(json!({ "intent": intent, "id": id })).await
    }

    pub async fn set_filter(&self, filter: &str) -> Response {
        self.post_intent(json!({ "intent": "set_filter", "filter": filter }))
            .await
    }

    pub async fn export(&self) -> Response {
        self.client
            .get(self.url("/export"))
            .send()
            .await
            .expect("Export request failed")
    }

    pub async fn import(&self, contents: String) -> Response {
        self.client
            .post(self.url("/import"))
            .body(contents)
            .send()
            .await
            .expect("Import request failed")
    }

    pub async fn upload_photo(&self, id: u32, bytes: &[u8]) -> Response {
        self.client
            .put(self.url(&format!("/item/{}/photo", id)))
            .body(bytes.to_vec())
            .send()
            .await
            .expect("Photo upload failed")
    }

    pub async fn get_image(&self, id: u32) -> Response {
        self.client
            .get(self.url(&format!("/image/{}", id)))
            .send()
            .await
            .expect("Image request failed")
    }

    pub async fn get_assets(&self) -> Response {
        self.client
            .get(self.url("/assets"))
            .send()
            .await
            .expect("Assets request failed")
    }

    pub async fn get_static(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Static request failed")
    }
}
