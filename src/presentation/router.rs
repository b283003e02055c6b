// Route table for the dashboard composer API
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    add_filter, add_tile, apply_layout, cancel_edit, close_session, create_dashboard, delete_dashboard, enter_edit,
    get_session, open_session, remove_filter, remove_tile, rename_session, save_session, session_events,
    update_dashboard_details, update_filter, update_tile,
};
use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/projects/:project_id/dashboards", post(create_dashboard))
        .route("/dashboards/:id", delete(delete_dashboard))
        .route("/dashboards/:id/details", patch(update_dashboard_details))
        .route("/dashboards/:id/sessions", post(open_session))
        .route("/sessions/:sid", get(get_session).delete(close_session))
        .route("/sessions/:sid/events", get(session_events))
        .route("/sessions/:sid/edit", post(enter_edit))
        .route("/sessions/:sid/cancel", post(cancel_edit))
        .route("/sessions/:sid/save", post(save_session))
        .route("/sessions/:sid/name", patch(rename_session))
        .route("/sessions/:sid/tiles", post(add_tile))
        .route("/sessions/:sid/tiles/:tile_id", patch(update_tile).delete(remove_tile))
        .route("/sessions/:sid/layout", post(apply_layout))
        .route("/sessions/:sid/filters", post(add_filter))
        .route("/sessions/:sid/filters/:filter_id", patch(update_filter).delete(remove_filter))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
