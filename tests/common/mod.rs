#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use campaign_refunds::api;
use campaign_refunds::api::auth::issue_token;
use campaign_refunds::app_state::AppState;
use campaign_refunds::config::Config;
use campaign_refunds::db::memory::MemoryStore;
use campaign_refunds::db::models::submission::{SubmissionStatus, SubmissionType};
use campaign_refunds::db::store::Store;

pub const PASSWORD: &str = "correct horse";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub config: Config,
}

pub struct Account {
    pub id: i32,
    pub token: String,
}

pub fn test_config() -> Config {
    Config::from_lookup(|name| match name {
        "DATABASE_URL" => Some("postgres://unused".to_string()),
        "JWT_SECRET" => Some("integration-test-secret".to_string()),
        _ => None,
    })
    .expect("test config")
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let config = test_config();
        let state = AppState::new(store.clone(), config.clone());
        Self {
            router: api::router(state),
            store,
            config,
        }
    }

    pub async fn account(&self, username: &str, role: &str, locked: bool) -> Account {
        let hash = bcrypt::hash(PASSWORD, 4).expect("hash");
        let id = self.store.insert_user(username, &hash, role, locked).await;
        let user = self.store.find_user(id).await.unwrap().unwrap();
        let token = issue_token(&self.config, &user).expect("token");
        Account { id, token }
    }

    pub async fn client(&self, username: &str) -> Account {
        self.account(username, "client", false).await
    }

    pub async fn admin(&self) -> Account {
        self.account("admin", "admin", false).await
    }

    /// Reward campaign: 10,000 points for 100 units, 30 delivered.
    pub async fn running_reward(&self, client_id: i32) -> i32 {
        self.store
            .insert_submission(
                SubmissionType::Reward,
                client_id,
                "Gangnam Noodle House",
                SubmissionStatus::InProgress,
                10_000,
                100,
                30,
            )
            .await
    }

    /// Sends one request through the full router; non-JSON bodies come back as a string.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }
}
