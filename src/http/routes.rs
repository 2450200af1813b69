use axum::{routing::get, routing::patch, routing::post, routing::put, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh_token))
        .route("/auth/revoke", post(handlers::revoke_token))
        .route("/auth/me", get(handlers::get_current_user))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::list_users))
        .route("/users/:id", get(handlers::get_user))
        .route("/users/:id", patch(handlers::update_profile))
}

pub fn messes() -> Router<AppState> {
    Router::new()
        .route("/messes", post(handlers::create_mess))
        .route("/messes", get(handlers::list_messes))
        .route("/messes/:id", get(handlers::get_mess))
        .route("/messes/:id", patch(handlers::update_mess))
        .route("/messes/:id/menu", get(handlers::get_menu))
        .route("/messes/:id/menu", put(handlers::put_menu))
        .route("/messes/:id/subscriptions", get(handlers::list_mess_subscriptions))
        .route("/messes/:id/deliveries", get(handlers::list_mess_deliveries))
}

pub fn subscriptions() -> Router<AppState> {
    Router::new()
        .route("/subscriptions", post(handlers::create_subscription))
        .route("/subscriptions", get(handlers::list_my_subscriptions))
        .route("/subscriptions/:id", get(handlers::get_subscription))
        .route("/subscriptions/:id/cancel", post(handlers::cancel_subscription))
        .route(
            "/subscriptions/:id/deliveries",
            get(handlers::list_subscription_deliveries),
        )
}

pub fn mess_cut() -> Router<AppState> {
    Router::new()
        .route("/mess-cut/eligibility", get(handlers::mess_cut_eligibility))
        .route("/subscriptions/:id/mess-cut", post(handlers::request_mess_cut))
        .route("/deliveries/:id/acknowledge", post(handlers::acknowledge_mess_cut))
        .route("/deliveries/:id/delivered", post(handlers::mark_delivered))
}

pub fn notifications() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(handlers::list_notifications))
        .route("/notifications/unread-count", get(handlers::unread_count))
        .route(
            "/notifications/:id/read",
            post(handlers::mark_notification_read),
        )
}
