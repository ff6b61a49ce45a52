use axum::{
    routing::{get, post},
    Router,
};

use crate::app_state::AppState;

use super::handlers::{create_reservation, get_availability};

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/availability", get(get_availability))
        .route("/reservations", post(create_reservation))
}
