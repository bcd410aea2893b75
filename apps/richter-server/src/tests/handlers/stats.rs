use serde_json::json;

use super::super::common::*;

#[tokio::test]
async fn admin_and_user_stats() {
    let app = create_test_app().await;
    register_admin(&app, "boss@x.com").await;
    register(&app, "a@x.com").await;
    let admin_token = app.token("boss@x.com");

    post(
        &app,
        "/menu",
        Some(&admin_token),
        json!({ "name": "Risotto", "category": "main", "price": 14.0 }),
    )
    .await;
    post(
        &app,
        "/carts",
        None,
        json!({ "email": "a@x.com", "menuId": "m-1", "name": "Risotto", "price": 14.0 }),
    )
    .await;
    post(
        &app,
        "/payments",
        None,
        json!({ "email": "a@x.com", "price": 20.0, "transactionId": "tx-1" }),
    )
    .await;
    post(
        &app,
        "/payments",
        None,
        json!({ "email": "a@x.com", "price": 5.0, "transactionId": "tx-2", "kind": "reservation" }),
    )
    .await;

    let (status, body) = get(&app, "/admin-stats", Some(&admin_token)).await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({ "users": 2, "menuItems": 1, "orders": 2, "revenue": 25.0 })
    );

    let (status, _) = get(&app, "/admin-stats", Some(&app.token("a@x.com"))).await;
    assert_eq!(status, 403);

    let (status, body) = get(&app, "/user-stats/A@x.com", Some(&app.token("a@x.com"))).await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({
            "orders": 1,
            "reservations": 1,
            "cartItems": 1,
            "reviews": 0,
            "totalSpent": 25.0,
        })
    );

    let (status, _) = get(&app, "/user-stats/a@x.com", None).await;
    assert_eq!(status, 401);
}
