use super::handlers;
use super::state::AppState;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/v1/events",
            get(handlers::events::catalog).post(handlers::events::trigger),
        )
        .route(
            "/api/v1/subscriptions",
            get(handlers::subscriptions::list).post(handlers::subscriptions::create),
        )
        .route(
            "/api/v1/subscriptions/:id",
            get(handlers::subscriptions::show)
                .patch(handlers::subscriptions::update)
                .delete(handlers::subscriptions::delete),
        )
        .route(
            "/api/v1/subscriptions/:id/deliveries",
            get(handlers::subscriptions::deliveries),
        )
}

pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}
