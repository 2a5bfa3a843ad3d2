use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use moka::future::Cache;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::{
    application::usecases::{
        orders::OrderUseCase,
        payments::{PaymentGateway, PaymentSettings, PaymentUseCase, WebhookOutcome},
        subscriptions::{SubscriptionError, SubscriptionSettings, SubscriptionUseCase},
    },
    config::config_model::DotEnvyConfig,
    domain::{
        repositories::{
            events::EventRepository, orders::OrderRepository, plans::PlanRepository,
            subscriptions::SubscriptionRepository,
        },
        value_objects::subscriptions::SubscriptionSnapshot,
    },
    infrastructure::{
        axum_http::error_responses::error_response,
        payments::chapa_client::ChapaClient,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{
                events::EventPostgres, orders::OrderPostgres, plans::PlanPostgres,
                subscriptions::SubscriptionPostgres,
            },
        },
    },
};

const SIGNATURE_HEADER: &str = "Chapa-Signature";

#[derive(Debug, Deserialize)]
pub struct InitiateCheckoutRequest {
    pub order_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentQuery {
    pub order_id: Uuid,
}

pub struct PaymentsState<E, O, G, P, S>
where
    E: EventRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    payment_usecase: Arc<PaymentUseCase<E, O, G>>,
    subscription_usecase: Arc<SubscriptionUseCase<P, S, G>>,
}

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    config: Arc<DotEnvyConfig>,
    snapshot_cache: Cache<String, SubscriptionSnapshot>,
) -> Router {
    let event_repository = Arc::new(EventPostgres::new(Arc::clone(&db_pool)));
    let order_repository = Arc::new(OrderPostgres::new(Arc::clone(&db_pool)));
    let plan_repository = Arc::new(PlanPostgres::new(Arc::clone(&db_pool)));
    let subscription_repository = Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool)));
    let gateway = Arc::new(ChapaClient::new(
        config.chapa.secret_key.clone(),
        config.chapa.webhook_secret.clone(),
        config.chapa.base_url.clone(),
    ));

    let order_usecase = Arc::new(OrderUseCase::new(
        Arc::clone(&event_repository),
        Arc::clone(&order_repository),
    ));
    let payment_usecase = Arc::new(PaymentUseCase::new(
        order_usecase,
        order_repository,
        Arc::clone(&gateway),
        PaymentSettings {
            success_url: config.payment.success_url.clone(),
            cancel_url: config.payment.cancel_url.clone(),
            poll_attempts: config.payment.poll_attempts,
            poll_backoff: std::time::Duration::from_millis(config.payment.poll_backoff_ms),
        },
    ));
    let subscription_usecase = Arc::new(SubscriptionUseCase::new(
        plan_repository,
        subscription_repository,
        gateway,
        snapshot_cache,
        SubscriptionSettings {
            success_url: config.subscription.success_url.clone(),
            cancel_url: config.subscription.cancel_url.clone(),
        },
    ));

    Router::new()
        .route("/initiate-payment", post(initiate_payment))
        .route("/webhook", post(webhook))
        .route("/verify", get(verify_payment))
        .with_state(Arc::new(PaymentsState {
            payment_usecase,
            subscription_usecase,
        }))
}

pub async fn initiate_payment<E, O, G, P, S>(
    State(state): State<Arc<PaymentsState<E, O, G, P, S>>>,
    Json(request): Json<InitiateCheckoutRequest>,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match state.payment_usecase.initiate_checkout(request.order_id).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

/// Gateway callback. A reference no order carries is offered to the
/// subscription flow; a reference nobody knows is acknowledged so the gateway
/// stops retrying, and logged for follow-up.
pub async fn webhook<E, O, G, P, S>(
    State(state): State<Arc<PaymentsState<E, O, G, P, S>>>,
    headers: HeaderMap,
    payload: Bytes,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    let signature = match headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) {
        Some(signature) => signature,
        None => {
            warn!("payments: webhook arrived without a signature header");
            return error_response(StatusCode::BAD_REQUEST, "missing signature header");
        }
    };

    match state.payment_usecase.handle_webhook(&payload, signature).await {
        Ok(WebhookOutcome::OrderConfirmed(order)) => (
            StatusCode::OK,
            Json(json!({ "status": "order_confirmed", "order_id": order.id })),
        )
            .into_response(),
        Ok(WebhookOutcome::Unverified { transaction_ref }) => (
            StatusCode::OK,
            Json(json!({ "status": "pending", "transaction_ref": transaction_ref })),
        )
            .into_response(),
        Ok(WebhookOutcome::UnmatchedTransaction { transaction_ref }) => {
            match state
                .subscription_usecase
                .confirm_payment(&transaction_ref)
                .await
            {
                Ok(subscription) => (
                    StatusCode::OK,
                    Json(json!({
                        "status": "subscription_confirmed",
                        "subscription_id": subscription.id,
                    })),
                )
                    .into_response(),
                Err(SubscriptionError::SubscriptionNotFound) => {
                    warn!(
                        transaction_ref,
                        "payments: webhook transaction matches no order or subscription"
                    );
                    (StatusCode::OK, Json(json!({ "status": "ignored" }))).into_response()
                }
                Err(err) => error_response(err.status_code(), err.to_string()),
            }
        }
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn verify_payment<E, O, G, P, S>(
    State(state): State<Arc<PaymentsState<E, O, G, P, S>>>,
    Query(query): Query<VerifyPaymentQuery>,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match state.payment_usecase.verify_payment(query.order_id).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}
