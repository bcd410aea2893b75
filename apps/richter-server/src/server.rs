//! Shared application state and the HTTP route table.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, put, MethodRouter},
    Router,
};
use richter_payments::PaymentProcessor;
use richter_storage::Store;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::access::{require_admin, require_auth};
use crate::email::Mailer;
use crate::handlers::{carts, menu, payments, reviews, stats, tokens, users, verification};
use crate::metrics::track_http;
use crate::token::TokenService;
use crate::verification::VerificationService;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenService>,
    pub verification: Arc<VerificationService>,
    pub payments: Arc<dyn PaymentProcessor>,
    pub mailer: Option<Arc<Mailer>>,
    pub currency: String,
    pub outbound_timeout: Duration,
}

/// Wrap `route` so it runs only for callers with a valid token.
fn authed(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(state.clone(), require_auth))
}

/// Wrap `route` so it runs only for authenticated admins. Authentication runs first.
fn admin(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
}

pub fn router(state: AppState) -> Router {
    let s = &state;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(root))
        // Tokens
        .route("/jwt", post(tokens::issue))
        // Accounts
        .route(
            "/users",
            post(users::register).merge(admin(s, get(users::list))),
        )
        .route("/users/{id}", admin(s, delete(users::remove)))
        .route(
            "/users/admin/{id}",
            patch(users::promote).merge(authed(s, get(users::is_admin))),
        )
        .route("/user/{email}", put(users::force_verify))
        // Verification
        .route("/verify/{code}", get(verification::redeem))
        .route("/sendMail/{email}", get(verification::resend))
        .route("/checkValid/{email}", get(verification::check_valid))
        // Menu
        .route(
            "/menu",
            get(menu::list).merge(admin(s, post(menu::create))),
        )
        .route(
            "/menu/{id}",
            get(menu::get_one).merge(admin(s, patch(menu::update).delete(menu::remove))),
        )
        // Reviews
        .route(
            "/reviews",
            get(reviews::list).merge(authed(s, post(reviews::create))),
        )
        // Carts
        .route("/carts", get(carts::list).post(carts::create))
        .route("/carts/{id}", delete(carts::remove))
        // Payments
        .route("/create-payment-intent", post(payments::create_intent))
        .route("/payments", post(payments::record))
        .route("/payments/{email}", authed(s, get(payments::list)))
        .route(
            "/payments/reservation/{email}",
            authed(s, get(payments::list_reservations)),
        )
        .route(
            "/payments/reconcile/{id}",
            admin(s, post(payments::reconcile)),
        )
        // Statistics
        .route("/admin-stats", admin(s, get(stats::admin)))
        .route("/user-stats/{email}", authed(s, get(stats::user)))
        .route_layer(from_fn(track_http))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> &'static str {
    "richter restaurant server"
}
