use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use richter_payments::{to_minor_units, PaymentError};
use richter_storage::{
    CartItemId, CreatePaymentParams, Payment, PaymentId, PaymentKind, StoreError,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ensure_self, parse_id};
use crate::email::EmailContent;
use crate::error::{ApiError, FORBIDDEN};
use crate::server::AppState;
use crate::token::Claims;
use crate::verification::normalize_email;

#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    pub price: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub email: String,
    pub price: f64,
    pub transaction_id: String,
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cart_ids: Vec<String>,
    #[serde(default)]
    pub menu_item_ids: Vec<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub kind: PaymentKind,
}

/// `POST /create-payment-intent`
pub async fn create_intent(
    State(state): State<AppState>,
    body: Result<Json<IntentRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let amount = to_minor_units(body.price).map_err(|e| ApiError::Validation(e.to_string()))?;

    let intent = tokio::time::timeout(
        state.outbound_timeout,
        state.payments.create_payment_intent(amount, &state.currency),
    )
    .await
    .unwrap_or(Err(PaymentError::Timeout))
    .map_err(|e| {
        tracing::error!(amount, error = %e, "Payment intent creation failed");
        ApiError::Upstream("payment processor unavailable")
    })?;

    tracing::info!(intent_id = %intent.id, amount, "Payment intent created");
    Ok(Json(json!({ "clientSecret": intent.client_secret })))
}

/// `POST /payments`: persist the payment, then clear the paid cart items.
///
/// The two writes are not atomic. When the cleanup fails the payment is flagged
/// `cartCleanupPending` for `POST /payments/reconcile/{id}`.
pub async fn record(
    State(state): State<AppState>,
    body: Result<Json<RecordPaymentRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    if !body.price.is_finite() || body.price < 0.0 {
        return Err(ApiError::Validation(
            "price must be a non-negative number".into(),
        ));
    }
    let transaction_id = body.transaction_id.trim().to_string();
    if transaction_id.is_empty() {
        return Err(ApiError::Validation("transactionId is required".into()));
    }
    let cart_ids = body
        .cart_ids
        .iter()
        .map(|id| parse_id::<CartItemId>(id, "cart item"))
        .collect::<Result<Vec<_>, _>>()?;

    let payment = state
        .store
        .create_payment(&CreatePaymentParams {
            email: normalize_email(&body.email)?,
            price: body.price,
            transaction_id,
            date: body.date.unwrap_or_else(Utc::now),
            cart_ids,
            menu_item_ids: body.menu_item_ids,
            status: body.status.unwrap_or_else(|| "pending".to_string()),
            kind: body.kind,
        })
        .await?;
    tracing::info!(
        payment_id = %payment.id,
        email = %payment.email,
        kind = %payment.kind,
        "Payment recorded"
    );

    let payment_result = json!({ "insertedId": payment.id });
    let response = match state.store.delete_cart_items(&payment.cart_ids).await {
        Ok(deleted) => json!({
            "paymentResult": payment_result,
            "deletedResult": { "deletedCount": deleted },
        }),
        Err(e) => {
            tracing::error!(
                payment_id = %payment.id,
                error = %e,
                "Payment recorded but cart cleanup failed; needs reconciliation"
            );
            if let Err(e) = state
                .store
                .set_payment_cleanup_pending(&payment.id, true)
                .await
            {
                // Reconcile does not depend on the flag.
                tracing::error!(payment_id = %payment.id, error = %e, "Could not flag payment");
            }
            json!({
                "paymentResult": payment_result,
                "cartCleanupPending": true,
            })
        }
    };

    send_receipt(&state, &payment).await;
    Ok(Json(response))
}

async fn send_receipt(state: &AppState, payment: &Payment) {
    let Some(mailer) = &state.mailer else {
        return;
    };
    let content = EmailContent::payment_receipt(&payment.transaction_id, payment.price);
    if let Err(e) = mailer.send(&payment.email, &content).await {
        tracing::warn!(payment_id = %payment.id, error = %e, "Receipt email failed");
    }
}

/// `POST /payments/reconcile/{id}`: re-run the cart cleanup of a payment.
///
/// Runs whatever the stored flag says, since the flag write itself can be the step
/// that failed. Deleting already removed cart lines is a no-op.
pub async fn reconcile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let payment_id: PaymentId = parse_id(&id, "payment")?;
    let payment = match state.store.get_payment(&payment_id).await {
        Ok(payment) => payment,
        Err(StoreError::NotFound) => return Ok(Json(json!({ "message": "payment not found" }))),
        Err(e) => return Err(e.into()),
    };

    let deleted = state.store.delete_cart_items(&payment.cart_ids).await?;
    if payment.cart_cleanup_pending {
        state
            .store
            .set_payment_cleanup_pending(&payment.id, false)
            .await?;
    }
    tracing::info!(
        payment_id = %payment.id,
        was_flagged = payment.cart_cleanup_pending,
        deleted,
        "Payment reconciled"
    );

    Ok(Json(json!({
        "cartCleanupPending": false,
        "deletedResult": { "deletedCount": deleted },
    })))
}

/// `GET /payments/{email}`
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let email = ensure_self(&claims, &email, FORBIDDEN)?;
    Ok(Json(state.store.list_payments(&email, None).await?))
}

/// `GET /payments/reservation/{email}`
pub async fn list_reservations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let email = ensure_self(&claims, &email, FORBIDDEN)?;
    Ok(Json(
        state
            .store
            .list_payments(&email, Some(PaymentKind::Reservation))
            .await?,
    ))
}
