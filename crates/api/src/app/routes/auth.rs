use std::sync::Arc;

use axum::{
    Router,
    extract::Extension,
    response::Response,
    routing::{get, post},
};
use serde_json::json;
use tracing::info;

use shopdesk_infra::workflows::SignupRequest;

use crate::app::dto::{self, ChangePasswordRequest, LoginRequest};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::context::AuthUser;

pub fn router() -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/password", post(change_password))
}

pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<SignupRequest>,
) -> ApiResult<Response> {
    let (user, customer) = services.shop.signup(body).await?;
    let token = services.issue_token(&user)?;
    Ok(dto::created(json!({
        "token": token,
        "user": dto::user_to_json(&user),
        "customer": dto::customer_to_json(&customer),
    })))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Response> {
    let user = services.shop.login(&body.email, &body.password).await?;
    let token = services.issue_token(&user)?;
    info!(user_id = %user.id, "user logged in");
    Ok(dto::ok(json!({
        "token": token,
        "expires_in": services.jwt.ttl().num_seconds(),
        "user": dto::user_to_json(&user),
    })))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
) -> ApiResult<Response> {
    let user = services
        .shop
        .users
        .get(principal.user_id())
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;
    let customer = services.shop.customer_for_user(user.id).await?;
    Ok(dto::ok(json!({
        "user": dto::user_to_json(&user),
        "customer": customer.as_ref().map(dto::customer_to_json),
    })))
}

pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Response> {
    services
        .shop
        .change_password(principal.user_id(), &body.current_password, &body.new_password)
        .await?;
    Ok(dto::ok(json!({ "message": "password updated" })))
}
