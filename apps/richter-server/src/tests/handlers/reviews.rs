use serde_json::json;

use super::super::common::*;

#[tokio::test]
async fn review_author_comes_from_token() {
    let app = create_test_app().await;
    let token = app.token("A@x.com");

    let (status, body) = post(
        &app,
        "/reviews",
        Some(&token),
        json!({ "name": "Ann", "details": "Great pasta", "rating": 4.5, "email": "other@x.com" }),
    )
    .await;
    assert_eq!(status, 200);
    assert!(body["insertedId"].is_string());

    let (status, body) = get(&app, "/reviews", None).await;
    assert_eq!(status, 200);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["email"], "a@x.com");
    assert_eq!(body[0]["rating"], 4.5);
}

#[tokio::test]
async fn review_validation_and_auth() {
    let app = create_test_app().await;
    let token = app.token("a@x.com");

    let (status, _) = post(
        &app,
        "/reviews",
        Some(&token),
        json!({ "name": "Ann", "details": "Too good", "rating": 6 }),
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = post(
        &app,
        "/reviews",
        Some(&token),
        json!({ "name": "Ann", "details": "   ", "rating": 3 }),
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = post(
        &app,
        "/reviews",
        None,
        json!({ "name": "Ann", "details": "ok", "rating": 3 }),
    )
    .await;
    assert_eq!(status, 401);
    assert!(app.store.list_reviews().await.unwrap().is_empty());
}
