use std::sync::Arc;

use axum::{Router, extract::Extension, response::Response, routing::get};
use serde_json::json;

use shopdesk_auth::permissions;
use shopdesk_settings::SettingsPatch;

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::AuthUser;

pub fn router() -> Router {
    Router::new().route("/", get(get_settings).patch(update_settings))
}

pub async fn get_settings(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<Response> {
    let settings = services.shop.store_settings().await?;
    Ok(dto::ok(json!({ "settings": dto::settings_to_json(&settings) })))
}

pub async fn update_settings(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    ApiJson(body): ApiJson<SettingsPatch>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::SETTINGS_MANAGE)?;
    let settings = services.shop.update_settings(body).await?;
    Ok(dto::ok(json!({ "settings": dto::settings_to_json(&settings) })))
}
