use axum::{Router, routing::get};

pub mod analytics;
pub mod auth;
pub mod common;
pub mod cart;
pub mod customers;
pub mod invoices;
pub mod orders;
pub mod products;
pub mod settings;
pub mod system;
pub mod users;

/// Router for every endpoint. Access rules are enforced per handler.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/auth", auth::router())
        .nest("/products", products::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/customers", customers::router())
        .nest("/invoices", invoices::router())
        .nest("/settings", settings::router())
        .nest("/analytics", analytics::router())
        .nest("/users", users::router())
}
