#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bookstore_api::{build_router, AppState};
use bookstore_core::event::{DomainEvent, EventListener, ListenerResult};
use bookstore_core::{open_db_in_memory, EventBus, FixedClock};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const NOW_MS: i64 = 1_700_000_000_000;

#[derive(Default)]
pub struct Recorder {
    pub events: Mutex<Vec<DomainEvent>>,
}

impl EventListener for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn on_event(&self, event: &DomainEvent) -> ListenerResult {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub clock: Arc<FixedClock>,
    pub recorder: Arc<Recorder>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let clock = Arc::new(FixedClock::new(NOW_MS));
        let recorder = Arc::new(Recorder::default());
        let events = EventBus::new().with_listener(recorder.clone());
        let state = AppState::new(open_db_in_memory().unwrap(), events, clock.clone(), 14);
        Self {
            router: build_router(state),
            clock,
            recorder,
        }
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&value).unwrap())
            }
            None => Body::empty(),
        };
        self.dispatch(builder.body(body).unwrap()).await
    }

    pub async fn send_text(&self, method: Method, uri: &str, text: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "text/tab-separated-values")
            .body(Body::from(text.to_string()))
            .unwrap();
        self.dispatch(request).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn dispatch(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            content_type,
            text: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }
}

pub fn book_json(title: &str, isbn: &str, price: i64) -> Value {
    serde_json::json!({
        "title": title,
        "author": "Test Author",
        "isbn": isbn,
        "price": price,
    })
}

pub async fn create_book(app: &TestApp, title: &str, isbn: &str, price: i64) -> i64 {
    let response = app.post("/api/books", book_json(title, isbn, price)).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    response.json()["id"].as_i64().unwrap()
}

pub async fn create_member(app: &TestApp, name: &str, email: &str) -> i64 {
    let response = app
        .post("/api/members", serde_json::json!({ "name": name, "email": email }))
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    response.json()["id"].as_i64().unwrap()
}
