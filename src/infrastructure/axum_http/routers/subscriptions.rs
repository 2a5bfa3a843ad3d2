use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use moka::future::Cache;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    application::usecases::{
        payments::PaymentGateway,
        subscriptions::{SubscriptionError, SubscriptionSettings, SubscriptionUseCase},
    },
    config::config_model::DotEnvyConfig,
    domain::{
        repositories::{plans::PlanRepository, subscriptions::SubscriptionRepository},
        value_objects::subscriptions::{
            CheckSubscriptionModel, CreateSubscriptionModel, SubscriptionSnapshot,
        },
    },
    infrastructure::{
        axum_http::error_responses::error_response,
        payments::chapa_client::ChapaClient,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{plans::PlanPostgres, subscriptions::SubscriptionPostgres},
        },
    },
};

#[derive(Debug, Deserialize)]
pub struct CancelSubscriptionRequest {
    pub user_id: Uuid,
}

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    config: Arc<DotEnvyConfig>,
    snapshot_cache: Cache<String, SubscriptionSnapshot>,
) -> Router {
    let plan_repository = Arc::new(PlanPostgres::new(Arc::clone(&db_pool)));
    let subscription_repository = Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool)));
    let gateway = Arc::new(ChapaClient::new(
        config.chapa.secret_key.clone(),
        config.chapa.webhook_secret.clone(),
        config.chapa.base_url.clone(),
    ));

    let subscription_usecase = SubscriptionUseCase::new(
        plan_repository,
        subscription_repository,
        gateway,
        snapshot_cache,
        SubscriptionSettings {
            success_url: config.subscription.success_url.clone(),
            cancel_url: config.subscription.cancel_url.clone(),
        },
    );

    Router::new()
        .route("/plans", get(list_plans))
        .route("/create", post(create_subscription))
        .route("/check", post(check_subscription))
        .route("/cancel", post(cancel_subscription))
        .with_state(Arc::new(subscription_usecase))
}

pub async fn list_plans<P, S, G>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<P, S, G>>>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    match subscription_usecase.list_plans().await {
        Ok(plans) => (StatusCode::OK, Json(plans)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn create_subscription<P, S, G>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<P, S, G>>>,
    Json(create_subscription_model): Json<CreateSubscriptionModel>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    match subscription_usecase
        .create_subscription(create_subscription_model)
        .await
    {
        Ok(outcome) => (StatusCode::CREATED, Json(outcome)).into_response(),
        // The existing subscription rides along so the client can offer the
        // force_renew choice.
        Err(SubscriptionError::ActiveSubscriptionExists(existing)) => (
            StatusCode::CONFLICT,
            Json(json!({
                "code": StatusCode::CONFLICT.as_u16(),
                "message": "an active subscription already exists",
                "subscription": existing,
            })),
        )
            .into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn check_subscription<P, S, G>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<P, S, G>>>,
    Json(check_subscription_model): Json<CheckSubscriptionModel>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    match subscription_usecase
        .check_subscription(check_subscription_model)
        .await
    {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn cancel_subscription<P, S, G>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<P, S, G>>>,
    Json(request): Json<CancelSubscriptionRequest>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    match subscription_usecase.cancel_subscription(request.user_id).await {
        Ok(cancelled) => (StatusCode::OK, Json(json!({ "cancelled": cancelled }))).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}
