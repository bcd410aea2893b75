use serde_json::json;

use super::super::common::*;
use super::{delete, patch, put};

#[tokio::test]
async fn force_verify_reports_counts() {
    let app = create_test_app().await;
    register(&app, "a@x.com").await;

    let (status, body) = put(&app, "/user/A@x.com").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "matchedCount": 1, "modifiedCount": 1 }));
    assert!(app.store.get_account_by_email("a@x.com").await.unwrap().verified);

    let (_, body) = put(&app, "/user/a@x.com").await;
    assert_eq!(body, json!({ "matchedCount": 1, "modifiedCount": 0 }));

    let (_, body) = put(&app, "/user/nobody@x.com").await;
    assert_eq!(body, json!({ "matchedCount": 0, "modifiedCount": 0 }));
}

#[tokio::test]
async fn is_admin_answers_only_for_the_caller() {
    let app = create_test_app().await;
    register_admin(&app, "boss@x.com").await;
    register(&app, "a@x.com").await;

    let token = app.token("boss@x.com");
    let (status, body) = get(&app, "/users/admin/boss@x.com", Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "admin": true }));

    let token = app.token("a@x.com");
    let (status, body) = get(&app, "/users/admin/a@x.com", Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "admin": false }));

    let (status, body) = get(&app, "/users/admin/boss@x.com", Some(&token)).await;
    assert_eq!(status, 403);
    assert_eq!(body, json!({ "message": "unauthorized access" }));
}

#[tokio::test]
async fn promote_is_idempotent_and_validates_id() {
    let app = create_test_app().await;
    let account = register(&app, "a@x.com").await;
    let uri = format!("/users/admin/{}", account.id);

    let (_, body) = patch(&app, &uri, None, json!({})).await;
    assert_eq!(body, json!({ "matchedCount": 1, "modifiedCount": 1 }));
    let (_, body) = patch(&app, &uri, None, json!({})).await;
    assert_eq!(body, json!({ "matchedCount": 1, "modifiedCount": 0 }));

    let (status, _) = patch(&app, "/users/admin/not-a-uuid", None, json!({})).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn admin_deletes_account_and_remote_identity() {
    let app = create_test_app().await;
    register_admin(&app, "boss@x.com").await;
    let victim = register(&app, "a@x.com").await;
    let token = app.token("boss@x.com");

    let (status, body) = delete(&app, &format!("/users/{}", victim.id), Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "deletedCount": 1 }));
    assert_eq!(app.identity.deleted(), vec!["a@x.com".to_string()]);

    let (_, body) = delete(&app, &format!("/users/{}", victim.id), Some(&token)).await;
    assert_eq!(body, json!({ "deletedCount": 0 }));
}

#[tokio::test]
async fn admin_lists_accounts_without_codes() {
    let app = create_test_app().await;
    register_admin(&app, "boss@x.com").await;
    register(&app, "a@x.com").await;

    let (status, body) = get(&app, "/users", Some(&app.token("boss@x.com"))).await;
    assert_eq!(status, 200);
    let accounts = body.as_array().unwrap();
    assert_eq!(accounts.len(), 2);
    for account in accounts {
        assert!(account.get("verificationCode").is_none());
        assert!(account.get("verification_code").is_none());
    }
}
