use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use crate::automation::{DryRun, EngineOptions, LeadRepository};
use crate::persistence::MemoryStore;
use crate::{AppState, build_router};
use leadgen_shared::LeadRecord;

/// The full router over an in-memory store. Side effects are recorded by
/// `dry_run` instead of leaving the process.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub dry_run: DryRun,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        super::init_test_logging();

        let store = Arc::new(MemoryStore::new());
        let dry_run = DryRun::new();
        let state = AppState::new(store.clone(), dry_run.side_effects(), options, None);

        Self {
            router: build_router(Arc::new(state)),
            store,
            dry_run,
        }
    }

    pub async fn seed_lead(&self, lead: &LeadRecord) {
        self.store.save_lead(lead).await.unwrap();
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, json)
    }
}
