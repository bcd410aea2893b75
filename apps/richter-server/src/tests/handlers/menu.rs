use serde_json::json;

use super::super::common::*;
use super::{delete, patch};

fn pizza() -> serde_json::Value {
    json!({ "name": "Margherita", "category": "pizza", "price": 11.5, "recipe": "tomato, basil" })
}

#[tokio::test]
async fn menu_crud_with_admin() {
    let app = create_test_app().await;
    register_admin(&app, "boss@x.com").await;
    let token = app.token("boss@x.com");

    let (status, body) = post(&app, "/menu", Some(&token), pizza()).await;
    assert_eq!(status, 200);
    let id = body["insertedId"].as_str().unwrap().to_string();

    let (status, body) = get(&app, "/menu", None).await;
    assert_eq!(status, 200);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Margherita");

    let (status, body) = patch(
        &app,
        &format!("/menu/{}", id),
        Some(&token),
        json!({ "price": 12.0 }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "matchedCount": 1, "modifiedCount": 1 }));

    let (_, body) = get(&app, &format!("/menu/{}", id), None).await;
    assert_eq!(body["price"], 12.0);
    assert_eq!(body["category"], "pizza");

    let (_, body) = delete(&app, &format!("/menu/{}", id), Some(&token)).await;
    assert_eq!(body, json!({ "deletedCount": 1 }));

    let (status, body) = get(&app, &format!("/menu/{}", id), None).await;
    assert_eq!(status, 200);
    assert!(body.is_null());
}

#[tokio::test]
async fn menu_writes_require_admin() {
    let app = create_test_app().await;
    register(&app, "a@x.com").await;
    let token = app.token("a@x.com");

    let (status, body) = post(&app, "/menu", Some(&token), pizza()).await;
    assert_eq!(status, 403);
    assert_eq!(body, json!({ "message": "forbidden access" }));

    let (status, _) = post(&app, "/menu", None, pizza()).await;
    assert_eq!(status, 401);
    assert!(app.store.list_menu_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn menu_validation() {
    let app = create_test_app().await;
    register_admin(&app, "boss@x.com").await;
    let token = app.token("boss@x.com");

    let (status, _) = post(
        &app,
        "/menu",
        Some(&token),
        json!({ "name": "Soup", "category": "starter", "price": -1.0 }),
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = post(
        &app,
        "/menu",
        Some(&token),
        json!({ "name": "  ", "category": "starter", "price": 4.0 }),
    )
    .await;
    assert_eq!(status, 400);

    let (_, body) = post(&app, "/menu", Some(&token), pizza()).await;
    let id = body["insertedId"].as_str().unwrap().to_string();
    let (status, body) = patch(&app, &format!("/menu/{}", id), Some(&token), json!({})).await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({ "message": "no fields to update" }));

    let (status, _) = get(&app, "/menu/not-a-uuid", None).await;
    assert_eq!(status, 400);
}
