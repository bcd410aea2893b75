use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;
use richter_storage::{
    CreatePaymentParams, MockStore, Payment, PaymentId, PaymentKind, StoreError,
};
use serde_json::{json, Value};

use super::super::common::*;
use crate::email::templates::EmailKind;

async fn cart_line(app: &TestApp, email: &str) -> String {
    let (_, body) = post(
        app,
        "/carts",
        None,
        json!({ "email": email, "menuId": "m-1", "name": "Gnocchi", "price": 10.0 }),
    )
    .await;
    body["insertedId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn intent_amount_is_rounded_to_minor_units() {
    let app = create_test_app().await;

    let (status, body) = post(&app, "/create-payment-intent", None, json!({ "price": 19.99 })).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "clientSecret": "pi_1999_secret" }));
    assert_eq!(
        *app.payments.amounts.lock().unwrap(),
        vec![(1999, "usd".to_string())]
    );
}

#[tokio::test]
async fn intent_rejects_unusable_prices() {
    let app = create_test_app().await;

    for price in [json!(0), json!(-5.0), json!(0.001)] {
        let (status, body) =
            post(&app, "/create-payment-intent", None, json!({ "price": price.clone() })).await;
        assert_eq!(status, 400, "price {}", price);
        assert!(body["message"].is_string());
    }
    let (status, _) = post(&app, "/create-payment-intent", None, json!({ "price": "ten" })).await;
    assert_eq!(status, 400);
    assert!(app.payments.amounts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn intent_processor_failure_is_502() {
    let app = create_test_app().await;
    app.payments.fail.store(true, Ordering::SeqCst);

    let (status, body) = post(&app, "/create-payment-intent", None, json!({ "price": 10 })).await;
    assert_eq!(status, 502);
    assert_eq!(body, json!({ "message": "payment processor unavailable" }));
}

#[tokio::test]
async fn record_clears_only_the_paid_cart_lines() {
    let app = create_test_app().await;
    let paid = cart_line(&app, "a@x.com").await;
    let kept = cart_line(&app, "a@x.com").await;

    let (status, body) = post(
        &app,
        "/payments",
        None,
        json!({
            "email": "a@x.com",
            "price": 10.0,
            "transactionId": "pi_123",
            "cartIds": [paid],
            "menuItemIds": ["m-1"],
            "status": "succeeded",
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert!(body["paymentResult"]["insertedId"].is_string());
    assert_eq!(body["deletedResult"], json!({ "deletedCount": 1 }));
    assert!(body.get("cartCleanupPending").is_none());

    let (_, carts) = get(&app, "/carts?email=a@x.com", None).await;
    let remaining = carts.as_array().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["_id"], Value::String(kept));

    // Nobody registered, so the receipt is the only email.
    let receipts = app.emails.sent();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].1.kind, EmailKind::Receipt);
    assert!(receipts[0].1.text.contains("pi_123"));
}

#[tokio::test]
async fn record_validates_input() {
    let app = create_test_app().await;

    let (status, _) = post(
        &app,
        "/payments",
        None,
        json!({ "email": "a@x.com", "price": 10.0, "transactionId": "  " }),
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = post(
        &app,
        "/payments",
        None,
        json!({ "email": "a@x.com", "price": 10.0, "transactionId": "t", "cartIds": ["bogus"] }),
    )
    .await;
    assert_eq!(status, 400);
    assert!(app
        .store
        .list_payments("a@x.com", None)
        .await
        .unwrap()
        .is_empty());
}

fn stored_payment(cart_cleanup_pending: bool) -> Payment {
    Payment {
        id: PaymentId::generate(),
        email: "a@x.com".into(),
        price: 10.0,
        transaction_id: "pi_9".into(),
        date: Utc::now(),
        cart_ids: Vec::new(),
        menu_item_ids: Vec::new(),
        status: "succeeded".into(),
        kind: PaymentKind::Order,
        cart_cleanup_pending,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn cleanup_failure_flags_payment_for_reconciliation() {
    let payment = stored_payment(false);
    let payment_id = payment.id.clone();

    let mut store = MockStore::new();
    store
        .expect_create_payment()
        .times(1)
        .returning(move |_| Ok(payment.clone()));
    store
        .expect_delete_cart_items()
        .times(1)
        .returning(|_| Err(StoreError::Backend("disk I/O error".into())));
    store
        .expect_set_payment_cleanup_pending()
        .withf(move |id, pending| *id == payment_id && *pending)
        .times(1)
        .returning(|_, _| Ok(()));
    let app = build_app(Arc::new(store), Arc::new(RecordingEmailProvider::default()));

    let (status, body) = post(
        &app,
        "/payments",
        None,
        json!({ "email": "a@x.com", "price": 10.0, "transactionId": "pi_9" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["cartCleanupPending"], true);
    assert!(body["paymentResult"]["insertedId"].is_string());
    assert!(body.get("deletedResult").is_none());
}

#[tokio::test]
async fn reconcile_retries_cleanup() {
    let app = create_test_app().await;
    register_admin(&app, "boss@x.com").await;
    let token = app.token("boss@x.com");
    let cart = cart_line(&app, "a@x.com").await;

    // Record through the store and flag it, as if the cleanup had failed.
    let payment = app
        .store
        .create_payment(&CreatePaymentParams {
            email: "a@x.com".into(),
            price: 10.0,
            transaction_id: "pi_7".into(),
            date: Utc::now(),
            cart_ids: vec![cart.parse().unwrap()],
            menu_item_ids: Vec::new(),
            status: "succeeded".into(),
            kind: PaymentKind::Order,
        })
        .await
        .unwrap();
    app.store
        .set_payment_cleanup_pending(&payment.id, true)
        .await
        .unwrap();

    let uri = format!("/payments/reconcile/{}", payment.id);
    let (status, body) = post(&app, &uri, Some(&token), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({ "cartCleanupPending": false, "deletedResult": { "deletedCount": 1 } })
    );
    assert!(!app.store.get_payment(&payment.id).await.unwrap().cart_cleanup_pending);

    // Nothing left to do the second time.
    let (_, body) = post(&app, &uri, Some(&token), json!({})).await;
    assert_eq!(body["deletedResult"]["deletedCount"], 0);

    let (_, body) = post(
        &app,
        &format!("/payments/reconcile/{}", PaymentId::generate()),
        Some(&token),
        json!({}),
    )
    .await;
    assert_eq!(body, json!({ "message": "payment not found" }));

    let (status, _) = post(&app, &uri, Some(&app.token("a@x.com")), json!({})).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn reconcile_cleans_up_an_unflagged_payment() {
    let app = create_test_app().await;
    register_admin(&app, "boss@x.com").await;
    let cart = cart_line(&app, "a@x.com").await;

    // Cleanup and the flag write both failed: carts remain, flag is still false.
    let payment = app
        .store
        .create_payment(&CreatePaymentParams {
            email: "a@x.com".into(),
            price: 10.0,
            transaction_id: "pi_8".into(),
            date: Utc::now(),
            cart_ids: vec![cart.parse().unwrap()],
            menu_item_ids: Vec::new(),
            status: "succeeded".into(),
            kind: PaymentKind::Order,
        })
        .await
        .unwrap();
    assert!(!payment.cart_cleanup_pending);

    let (status, body) = post(
        &app,
        &format!("/payments/reconcile/{}", payment.id),
        Some(&app.token("boss@x.com")),
        json!({}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["deletedResult"]["deletedCount"], 1);

    let (_, carts) = get(&app, "/carts?email=a@x.com", None).await;
    assert!(carts.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn record_reports_pending_even_when_flag_write_fails() {
    let payment = stored_payment(false);

    let mut store = MockStore::new();
    store
        .expect_create_payment()
        .times(1)
        .returning(move |_| Ok(payment.clone()));
    store
        .expect_delete_cart_items()
        .times(1)
        .returning(|_| Err(StoreError::Backend("disk I/O error".into())));
    store
        .expect_set_payment_cleanup_pending()
        .times(1)
        .returning(|_, _| Err(StoreError::Backend("disk I/O error".into())));
    let app = build_app(Arc::new(store), Arc::new(RecordingEmailProvider::default()));

    let (status, body) = post(
        &app,
        "/payments",
        None,
        json!({ "email": "a@x.com", "price": 10.0, "transactionId": "pi_9" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["cartCleanupPending"], true);
}

#[tokio::test]
async fn payment_history_is_self_only() {
    let app = create_test_app().await;
    for (tx, kind) in [("tx-1", "order"), ("tx-2", "reservation")] {
        post(
            &app,
            "/payments",
            None,
            json!({ "email": "a@x.com", "price": 8.0, "transactionId": tx, "kind": kind }),
        )
        .await;
    }
    let token = app.token("a@x.com");

    let (status, body) = get(&app, "/payments/a@x.com", Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = get(&app, "/payments/reservation/a@x.com", Some(&token)).await;
    assert_eq!(status, 200);
    let reservations = body.as_array().unwrap();
    assert_eq!(reservations.len(), 1);
    assert_eq!(reservations[0]["transactionId"], "tx-2");
    assert_eq!(reservations[0]["kind"], "reservation");

    let other = app.token("b@x.com");
    let (status, body) = get(&app, "/payments/a@x.com", Some(&other)).await;
    assert_eq!(status, 403);
    assert_eq!(body, json!({ "message": "forbidden access" }));
    let (status, _) = get(&app, "/payments/reservation/a@x.com", Some(&other)).await;
    assert_eq!(status, 403);
}
