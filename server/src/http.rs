//! Read-only snapshot routes and the full router.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use disaster_shared::protocol::{PersonWire, ShapeWire};
use tower_http::cors::CorsLayer;

use crate::ws::{ws_handler, AppState};

pub async fn get_shapes(State(app_state): State<AppState>) -> Json<Vec<ShapeWire>> {
    Json(
        app_state
            .world
            .snapshot_shapes()
            .iter()
            .map(|s| s.to_wire())
            .collect(),
    )
}

pub async fn get_people(State(app_state): State<AppState>) -> Json<Vec<PersonWire>> {
    Json(
        app_state
            .world
            .snapshot_people()
            .iter()
            .map(|p| p.to_wire())
            .collect(),
    )
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/shapes", get(get_shapes))
        .route("/people", get(get_people))
        // Paths used by older clients
        .route("/getshapes", get(get_shapes))
        .route("/getpeople", get(get_people))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
