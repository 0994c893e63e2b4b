//! Shared fixtures for router-level tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{HeaderMap, Request, StatusCode},
    Extension, Router,
};
use bayhook_api::{create_router, AppState, AuthStrategy, Authenticator};
use bayhook_core::{FixedClock, OutputRow};
use bayhook_warehouse::{InsertOutcome, RowError, Warehouse, WarehouseError};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

pub const TOKEN: &str = "s3cret-token";
pub const ALLOWED_IP: &str = "203.0.113.7";

/// What the fake warehouse answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    Insert,
    Reject(Vec<RowError>),
    Fail(WarehouseError),
    /// Accepts the row after the given delay.
    Slow(Duration),
}

/// In-memory warehouse that records every row it is given.
#[derive(Debug)]
pub struct RecordingWarehouse {
    reply: Reply,
    rows: Mutex<Vec<OutputRow>>,
}

impl RecordingWarehouse {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self { reply, rows: Mutex::new(Vec::new()) })
    }

    pub fn rows(&self) -> Vec<OutputRow> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl Warehouse for RecordingWarehouse {
    async fn insert_row(&self, row: &OutputRow) -> bayhook_warehouse::Result<InsertOutcome> {
        self.rows.lock().unwrap().push(row.clone());

        match &self.reply {
            Reply::Insert => Ok(InsertOutcome::Inserted { rows: 1 }),
            Reply::Reject(errors) => Ok(InsertOutcome::Rejected { errors: errors.clone() }),
            Reply::Fail(err) => Err(err.clone()),
            Reply::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(InsertOutcome::Inserted { rows: 1 })
            },
        }
    }

    fn destination(&self) -> String {
        "proj.parking.events".to_string()
    }
}

pub fn invalid_row_error() -> RowError {
    RowError {
        index: 0,
        reason: "invalid".to_string(),
        location: "bay".to_string(),
        message: "Cannot convert value to integer".to_string(),
    }
}

pub fn state(strategy: AuthStrategy, secret: Option<&str>, warehouse: Arc<dyn Warehouse>) -> AppState {
    state_with_timeout(strategy, secret, warehouse, Duration::from_secs(5))
}

pub fn state_with_timeout(
    strategy: AuthStrategy,
    secret: Option<&str>,
    warehouse: Arc<dyn Warehouse>,
    request_timeout: Duration,
) -> AppState {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap());

    AppState::new(
        Authenticator::new(strategy, secret.map(String::from)),
        warehouse,
        Arc::new(clock),
        request_timeout,
    )
}

pub fn token_router(warehouse: Arc<dyn Warehouse>) -> Router {
    create_router(state(AuthStrategy::Token, Some(TOKEN), warehouse))
}

pub fn ip_router(warehouse: Arc<dyn Warehouse>, peer: Option<SocketAddr>) -> Router {
    let router = create_router(state(AuthStrategy::Ip, Some(ALLOWED_IP), warehouse));
    match peer {
        Some(addr) => router.layer(Extension(ConnectInfo(addr))),
        None => router,
    }
}

pub fn post(uri: &str, headers: &[(&str, &str)], body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri).header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(body.into()).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

/// Sends `request` and returns the status, the JSON body (or null) and the
/// response headers.
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value, HeaderMap) {
    let response = router.oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (parts.status, json, parts.headers)
}
