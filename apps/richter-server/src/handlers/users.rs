use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use richter_storage::{Account, AccountId, Role, StoreError, UpdateOutcome};
use serde::Deserialize;
use serde_json::{json, Value};

use super::parse_id;
use crate::error::{ApiError, UNAUTHORIZED};
use crate::server::AppState;
use crate::token::Claims;
use crate::verification::{normalize_email, Notification, Registered, Registration};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    /// Identity provider reference
    pub uid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub email: Option<String>,
}

/// `POST /users`
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let registration = Registration {
        email: body.email,
        name: body.name,
        photo_url: body.photo_url,
        external_ref: body.uid,
    };

    match state.verification.register(registration).await? {
        Registered::AlreadyExists(_) => Ok(Json(json!({
            "message": "user already exists",
            "insertedId": null,
        }))),
        Registered::Created {
            account,
            notification,
        } => {
            let mut response = json!({
                "insertedId": account.id,
                "verificationEmailSent": notification == Notification::Sent,
            });
            let warning = match notification {
                Notification::Sent => None,
                Notification::Disabled => Some("email delivery is not configured".to_string()),
                Notification::Failed(_) => Some(
                    "verification email could not be sent; request a new one via /sendMail"
                        .to_string(),
                ),
            };
            if let Some(warning) = warning {
                response["warning"] = Value::String(warning);
            }
            Ok(Json(response))
        }
    }
}

/// `GET /users`
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Account>>, ApiError> {
    Ok(Json(state.store.list_accounts().await?))
}

/// `DELETE /users/{id}?email=`
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let account_id: AccountId = parse_id(&id, "account")?;
    let deleted = state
        .verification
        .delete_account(&account_id, query.email.as_deref())
        .await?;
    Ok(Json(json!({ "deletedCount": deleted })))
}

/// `PATCH /users/admin/{id}`
pub async fn promote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UpdateOutcome>, ApiError> {
    let account_id: AccountId = parse_id(&id, "account")?;
    let outcome = state.store.set_account_role(&account_id, Role::Admin).await?;
    if outcome.modified > 0 {
        tracing::info!(account_id = %account_id, "Account promoted to admin");
    }
    Ok(Json(outcome))
}

/// `GET /users/admin/{email}`: whether the caller is an admin.
pub async fn is_admin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(email): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let email = super::ensure_self(&claims, &email, UNAUTHORIZED)?;
    let admin = match state.store.get_account_by_email(&email).await {
        Ok(account) => account.role.is_admin(),
        Err(StoreError::NotFound) => false,
        Err(e) => return Err(e.into()),
    };
    Ok(Json(json!({ "admin": admin })))
}

/// `PUT /user/{email}`: mark the account verified without a code.
pub async fn force_verify(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<UpdateOutcome>, ApiError> {
    let email = normalize_email(&email)?;
    let outcome = state.store.mark_email_verified(&email).await?;
    if outcome.modified > 0 {
        tracing::info!(email = %email, "Account verified without code");
    }
    Ok(Json(outcome))
}
