use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tracing::error;
use uuid::Uuid;

use crate::{
    domain::{repositories::events::EventRepository, value_objects::events::EventModel},
    infrastructure::{
        axum_http::error_responses::error_response,
        postgres::{postgres_connection::PgPoolSquad, repositories::events::EventPostgres},
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let event_repository = EventPostgres::new(Arc::clone(&db_pool));

    Router::new()
        .route("/", get(list_events))
        .route("/:event_id", get(get_event))
        .with_state(Arc::new(event_repository))
}

pub async fn list_events<E>(State(event_repo): State<Arc<E>>) -> impl IntoResponse
where
    E: EventRepository + Send + Sync,
{
    match event_repo.list_published().await {
        Ok(events) => {
            let events: Vec<EventModel> = events.into_iter().map(EventModel::from).collect();
            (StatusCode::OK, Json(events)).into_response()
        }
        Err(err) => {
            error!(db_error = ?err, "events: failed to list published events");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "")
        }
    }
}

pub async fn get_event<E>(
    State(event_repo): State<Arc<E>>,
    Path(event_id): Path<Uuid>,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync,
{
    match event_repo.find_by_id(event_id).await {
        // The catalog only ever exposes published events.
        Ok(Some(entity)) if entity.is_published => {
            (StatusCode::OK, Json(EventModel::from(entity))).into_response()
        }
        Ok(_) => error_response(StatusCode::NOT_FOUND, "event not found"),
        Err(err) => {
            error!(%event_id, db_error = ?err, "events: failed to load event");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "")
        }
    }
}
