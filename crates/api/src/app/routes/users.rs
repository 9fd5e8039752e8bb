use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    response::Response,
    routing::{get, patch, post},
};
use serde_json::json;

use shopdesk_auth::permissions;
use shopdesk_core::{PageRequest, UserId};

use crate::app::dto::{self, SetRoleRequest};
use crate::app::errors::ApiResult;
use crate::app::extract::{ApiJson, ApiQuery, parse_id};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::AuthUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/:id/role", patch(set_role))
        .route("/:id/suspend", post(suspend_user))
        .route("/:id/activate", post(activate_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    ApiQuery(paging): ApiQuery<PageRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::USERS_MANAGE)?;
    let mut users = services.shop.users.list().await?;
    users.sort_by(|a, b| a.email.as_str().cmp(b.email.as_str()));
    let page = paging.apply(users).map(|u| dto::user_to_json(&u));
    Ok(dto::ok(dto::page_to_json(page)))
}

pub async fn set_role(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SetRoleRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::USERS_MANAGE)?;
    let target: UserId = parse_id(&id, "user")?;
    let user = services.shop.set_user_role(principal.user_id(), target, body.role).await?;
    Ok(dto::ok(json!({ "user": dto::user_to_json(&user) })))
}

pub async fn suspend_user(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::USERS_MANAGE)?;
    let target: UserId = parse_id(&id, "user")?;
    let user = services.shop.suspend_user(principal.user_id(), target).await?;
    Ok(dto::ok(json!({ "user": dto::user_to_json(&user) })))
}

pub async fn activate_user(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::USERS_MANAGE)?;
    let target: UserId = parse_id(&id, "user")?;
    let user = services.shop.activate_user(target).await?;
    Ok(dto::ok(json!({ "user": dto::user_to_json(&user) })))
}
