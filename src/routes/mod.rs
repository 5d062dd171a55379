pub mod ws;

use axum::routing::get;
use axum::Router;

use crate::state::SharedState;

pub fn hub_routes() -> Router<SharedState> {
    Router::new().route("/ws", get(ws::upgrade))
}
