//! Common test helpers and utilities for server tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use richter_payments::{PaymentError, PaymentIntent, PaymentProcessor};
use richter_storage::{Account, Role, Store};
use richter_store_sqlite::SqliteStore;
use serde_json::{json, Map, Value};
use tower::ServiceExt;
use url::Url;

use crate::email::{EmailContent, EmailError, EmailProvider, Mailer};
use crate::identity::{IdentityError, IdentityProvider};
use crate::server::{self, AppState};
use crate::token::TokenService;
use crate::verification::VerificationService;

pub const SECRET: &[u8] = b"test-secret";
pub const PUBLIC_URL: &str = "http://localhost:5000";

// ───────────────────────────────────── Fakes ──────────────────────────────────────────

/// Email provider that records every message instead of sending it.
#[derive(Default)]
pub struct RecordingEmailProvider {
    pub sent: Mutex<Vec<(String, EmailContent)>>,
    pub fail: AtomicBool,
}

impl RecordingEmailProvider {
    pub fn failing() -> Self {
        let provider = Self::default();
        provider.fail.store(true, Ordering::SeqCst);
        provider
    }

    pub fn sent(&self) -> Vec<(String, EmailContent)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailProvider for RecordingEmailProvider {
    async fn send(&self, _from: &str, to: &str, content: &EmailContent) -> Result<(), EmailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmailError::SendFailed("connection refused".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), content.clone()));
        Ok(())
    }
}

/// Identity provider that records calls.
#[derive(Default)]
pub struct RecordingIdentityProvider {
    pub verified: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl RecordingIdentityProvider {
    pub fn verified(&self) -> Vec<String> {
        self.verified.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for RecordingIdentityProvider {
    async fn mark_email_verified(&self, uid: &str) -> Result<(), IdentityError> {
        self.verified.lock().unwrap().push(uid.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(IdentityError::Status(503));
        }
        Ok(())
    }

    async fn delete_user_by_email(&self, email: &str) -> Result<(), IdentityError> {
        self.deleted.lock().unwrap().push(email.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(IdentityError::Status(503));
        }
        Ok(())
    }
}

/// Payment processor returning predictable intents.
#[derive(Default)]
pub struct FakePaymentProcessor {
    pub amounts: Mutex<Vec<(i64, String)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl PaymentProcessor for FakePaymentProcessor {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PaymentError::Provider("card network down".into()));
        }
        self.amounts
            .lock()
            .unwrap()
            .push((amount_minor, currency.to_string()));
        Ok(PaymentIntent {
            id: format!("pi_{}", amount_minor),
            client_secret: format!("pi_{}_secret", amount_minor),
        })
    }
}

// ───────────────────────────────────── Test app ───────────────────────────────────────

pub struct TestApp {
    pub store: Arc<dyn Store>,
    pub emails: Arc<RecordingEmailProvider>,
    pub identity: Arc<RecordingIdentityProvider>,
    pub payments: Arc<FakePaymentProcessor>,
    pub state: AppState,
}

impl TestApp {
    pub fn router(&self) -> Router {
        server::router(self.state.clone())
    }

    /// Session token for `email`, signed with the test secret.
    pub fn token(&self, email: &str) -> String {
        token_for(email)
    }
}

pub fn token_service() -> TokenService {
    TokenService::new(SECRET, Duration::from_secs(3600))
}

pub fn token_for(email: &str) -> String {
    let mut payload = Map::new();
    payload.insert("email".into(), Value::String(email.into()));
    token_service().issue(payload).unwrap()
}

/// Build application state around `store` with recording fakes for every collaborator.
pub fn build_app(store: Arc<dyn Store>, emails: Arc<RecordingEmailProvider>) -> TestApp {
    let identity = Arc::new(RecordingIdentityProvider::default());
    let payments = Arc::new(FakePaymentProcessor::default());
    let timeout = Duration::from_secs(2);

    let mailer = Arc::new(Mailer::new(
        emails.clone(),
        "noreply@richter.example".into(),
        Some("Richter".into()),
        timeout,
    ));
    let verification = Arc::new(VerificationService::new(
        store.clone(),
        Some(mailer.clone()),
        Some(identity.clone()),
        Url::parse(PUBLIC_URL).unwrap(),
        timeout,
    ));

    let state = AppState {
        store: store.clone(),
        tokens: Arc::new(token_service()),
        verification,
        payments: payments.clone(),
        mailer: Some(mailer),
        currency: "usd".into(),
        outbound_timeout: timeout,
    };

    TestApp {
        store,
        emails,
        identity,
        payments,
        state,
    }
}

/// Test helper: app over a fresh in-memory SQLite store.
pub async fn create_test_app() -> TestApp {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    build_app(store, Arc::new(RecordingEmailProvider::default()))
}

// ───────────────────────────────────── Requests ───────────────────────────────────────

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Drive one request through `router`, returning the status and the JSON body
/// (`Value::Null` for an empty or non-JSON body).
pub async fn send(router: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub async fn get(app: &TestApp, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(app.router(), request(Method::GET, uri, token, None)).await
}

pub async fn post(app: &TestApp, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    send(app.router(), request(Method::POST, uri, token, Some(body))).await
}

// ───────────────────────────────────── Fixtures ───────────────────────────────────────

/// Register `email` through the HTTP surface and return the stored account.
pub async fn register(app: &TestApp, email: &str) -> Account {
    let (status, body) = post(
        app,
        "/users",
        None,
        json!({ "email": email, "name": "Ann", "uid": format!("uid-{}", email) }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {}", body);
    app.store.get_account_by_email(email).await.unwrap()
}

/// Register `email` and promote it to admin directly in the store.
pub async fn register_admin(app: &TestApp, email: &str) -> Account {
    let account = register(app, email).await;
    app.store
        .set_account_role(&account.id, Role::Admin)
        .await
        .unwrap();
    app.store.get_account_by_id(&account.id).await.unwrap()
}

/// The verification code embedded in the most recent email to `email`.
pub fn code_from_last_email(app: &TestApp, email: &str) -> String {
    let sent = app.emails.sent();
    let (_, content) = sent
        .iter()
        .rev()
        .find(|(to, _)| to == email)
        .expect("no email sent to recipient");
    let start = content.text.find("/verify/").expect("no link in email") + "/verify/".len();
    content.text[start..start + 8].to_string()
}
