use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    application::usecases::{orders::OrderUseCase, tickets::TicketUseCase},
    domain::{
        repositories::{events::EventRepository, orders::OrderRepository},
        value_objects::orders::CreateOrderModel,
    },
    infrastructure::{
        axum_http::error_responses::error_response,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{events::EventPostgres, orders::OrderPostgres},
        },
    },
};

#[derive(Debug, Deserialize)]
pub struct OrderDetailsQuery {
    pub order_id: Uuid,
}

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let event_repository = Arc::new(EventPostgres::new(Arc::clone(&db_pool)));
    let order_repository = Arc::new(OrderPostgres::new(Arc::clone(&db_pool)));

    let order_usecase = OrderUseCase::new(
        Arc::clone(&event_repository),
        Arc::clone(&order_repository),
    );
    let ticket_usecase = TicketUseCase::new(event_repository, order_repository);

    let order_routes = Router::new()
        .route("/rsvp", post(create_order))
        .route("/details", get(get_order_details))
        .route("/:order_id", get(get_order))
        .route("/:order_id/cancel", post(cancel_order))
        .with_state(Arc::new(order_usecase));

    let ticket_routes = Router::new()
        .route("/:order_id/ticket", get(issue_ticket))
        .route("/:order_id/meeting-access", get(issue_meeting_access))
        .with_state(Arc::new(ticket_usecase));

    order_routes.merge(ticket_routes)
}

pub async fn create_order<E, O>(
    State(order_usecase): State<Arc<OrderUseCase<E, O>>>,
    Json(create_order_model): Json<CreateOrderModel>,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
{
    match order_usecase.create_order(create_order_model).await {
        Ok(order) => (
            StatusCode::CREATED,
            Json(json!({ "order_id": order.id, "status": order.status })),
        )
            .into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn get_order<E, O>(
    State(order_usecase): State<Arc<OrderUseCase<E, O>>>,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
{
    match order_usecase.get_order(order_id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn get_order_details<E, O>(
    State(order_usecase): State<Arc<OrderUseCase<E, O>>>,
    Query(query): Query<OrderDetailsQuery>,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
{
    match order_usecase.get_order_details(query.order_id).await {
        Ok(details) => (StatusCode::OK, Json(details)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

/// Cancel path for buyers who abandon checkout at the gateway.
pub async fn cancel_order<E, O>(
    State(order_usecase): State<Arc<OrderUseCase<E, O>>>,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
{
    match order_usecase.cancel_order(order_id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn issue_ticket<E, O>(
    State(ticket_usecase): State<Arc<TicketUseCase<E, O>>>,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
{
    match ticket_usecase.issue_ticket(order_id).await {
        Ok(ticket) => (StatusCode::OK, Json(ticket)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn issue_meeting_access<E, O>(
    State(ticket_usecase): State<Arc<TicketUseCase<E, O>>>,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
{
    match ticket_usecase.issue_meeting_access(order_id).await {
        Ok(access) => (StatusCode::OK, Json(access)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}
