use anyhow::Context;

use shopdesk_api::app::{self, AppServices};
use shopdesk_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env().context("invalid configuration")?;
    shopdesk_observability::init();

    if config.insecure_jwt_secret {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let services = AppServices::from_config(&config)
        .await
        .context("failed to initialize document store")?;

    if let Some(seed) = &config.seed_admin {
        let admin = services
            .seed_admin(seed)
            .await
            .context("failed to seed admin user")?;
        tracing::info!(user_id = %admin.id, email = %admin.email, "admin account ready");
    }

    let app = app::build_app(services, config.cors_allowed_origin.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
