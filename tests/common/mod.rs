//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use chainline::{Context, Handler, Router};

/// Ordered record of which handlers ran.
pub type Log = Arc<Mutex<Vec<&'static str>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<&'static str> {
    log.lock().unwrap().clone()
}

/// A captured response.
#[derive(Debug)]
pub struct Captured {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Captured {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Drive one request through `router` in-process.
pub async fn send(router: &Router, method: Method, uri: &str, body: &str) -> Captured {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.handle(request).await;

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    Captured {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

pub async fn get(router: &Router, uri: &str) -> Captured {
    send(router, Method::GET, uri, "").await
}

/// Middleware that records `name` and continues the chain.
pub fn mark(log: &Log, name: &'static str) -> impl Handler {
    let log = log.clone();
    move |ctx: Context| {
        let log = log.clone();
        async move {
            log.lock().unwrap().push(name);
            ctx.proceed().await
        }
    }
}

/// Endpoint that records `name` and answers with it.
pub fn endpoint(log: &Log, name: &'static str) -> impl Handler {
    let log = log.clone();
    move |ctx: Context| {
        let log = log.clone();
        async move {
            log.lock().unwrap().push(name);
            ctx.json(&serde_json::json!({ "handler": name }))
        }
    }
}

/// Middleware that records `name`, sets `status` and fails with `message`.
pub fn reject(log: &Log, name: &'static str, status: StatusCode, message: &'static str) -> impl Handler {
    let log = log.clone();
    move |ctx: Context| {
        let log = log.clone();
        async move {
            log.lock().unwrap().push(name);
            ctx.status(status)?;
            Err::<(), _>(chainline::Error::msg(message))
        }
    }
}
