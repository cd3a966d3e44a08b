use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod auth;
pub mod cars;
pub mod clients;
pub mod health;
pub mod orders;
pub mod users;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new().route("/login", post(auth::login));

    let cars_routes = Router::new()
        .route("/", get(cars::list_cars).post(cars::create_car))
        .route(
            "/:id",
            get(cars::get_car)
                .put(cars::update_car)
                .delete(cars::delete_car),
        );

    let clients_routes = Router::new()
        .route("/", get(clients::list_clients).post(clients::create_client))
        .route(
            "/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        );

    let orders_routes = Router::new()
        .route("/", get(orders::list_orders).post(orders::create_order))
        .route(
            "/:id",
            get(orders::get_order)
                .put(orders::update_order)
                .delete(orders::delete_order),
        );

    let users_routes = Router::new()
        .route("/create", post(users::create_user))
        .route("/", get(users::list_users))
        .route("/:id", get(users::get_user))
        .route("/update/:id", patch(users::update_user))
        .route("/delete/:id", delete(users::delete_user));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/cars", cars_routes)
        .nest("/clients", clients_routes)
        .nest("/orders", orders_routes)
        .nest("/users", users_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/auth", auth_routes)
        .route("/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339_opts(SecondsFormat::Millis, true)
}
