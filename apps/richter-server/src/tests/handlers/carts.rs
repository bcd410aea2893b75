use serde_json::{json, Value};

use super::super::common::*;
use super::delete;

fn line(email: &str, name: &str) -> Value {
    json!({ "email": email, "menuId": "m-1", "name": name, "price": 9.5 })
}

#[tokio::test]
async fn cart_lines_are_scoped_by_email() {
    let app = create_test_app().await;

    let (status, body) = post(&app, "/carts", None, line("A@x.com", "Lasagne")).await;
    assert_eq!(status, 200);
    let id = body["insertedId"].as_str().unwrap().to_string();
    post(&app, "/carts", None, line("b@x.com", "Tiramisu")).await;

    let (status, body) = get(&app, "/carts?email=a@x.com", None).await;
    assert_eq!(status, 200);
    let lines = body.as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["name"], "Lasagne");
    assert_eq!(lines[0]["menuId"], "m-1");

    let (_, body) = delete(&app, &format!("/carts/{}", id), None).await;
    assert_eq!(body, json!({ "deletedCount": 1 }));
    let (_, body) = get(&app, "/carts?email=a@x.com", None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn cart_requests_are_validated() {
    let app = create_test_app().await;

    let (status, body) = get(&app, "/carts", None).await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({ "message": "email query parameter is required" }));

    let (status, _) = post(
        &app,
        "/carts",
        None,
        json!({ "email": "a@x.com", "menuId": "m-1", "name": "x", "price": -2 }),
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = delete(&app, "/carts/nope", None).await;
    assert_eq!(status, 400);
}
