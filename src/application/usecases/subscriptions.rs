use std::{collections::HashMap, sync::Arc};

use chrono::{Duration, Utc};
use moka::future::Cache;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    application::usecases::payments::{CheckoutSessionRequest, PaymentGateway},
    domain::{
        entities::{plans::PlanEntity, subscriptions::InsertSubscriptionEntity},
        repositories::{plans::PlanRepository, subscriptions::SubscriptionRepository},
        value_objects::{
            enums::subscription_statuses::SubscriptionStatus,
            subscriptions::{
                CheckSubscriptionModel, CreateSubscriptionModel, CreateSubscriptionOutcome,
                PlanModel, SubscriptionModel, SubscriptionSnapshot,
            },
        },
    },
};

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("plan not found")]
    PlanNotFound,
    #[error("subscription not found")]
    SubscriptionNotFound,
    #[error("an active subscription already exists")]
    ActiveSubscriptionExists(Box<SubscriptionModel>),
    #[error("invalid subscription request: {0}")]
    Validation(String),
    #[error("subscription state conflict: {0}")]
    Conflict(String),
    #[error("payment gateway unavailable")]
    GatewayUnavailable(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            SubscriptionError::PlanNotFound | SubscriptionError::SubscriptionNotFound => {
                StatusCode::NOT_FOUND
            }
            SubscriptionError::ActiveSubscriptionExists(_) | SubscriptionError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            SubscriptionError::Validation(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            SubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type SubscriptionResult<T> = std::result::Result<T, SubscriptionError>;

#[derive(Debug, Clone)]
pub struct SubscriptionSettings {
    pub success_url: String,
    pub cancel_url: String,
}

/// Organizer plan subscriptions: creation, trial activation, forced renewal
/// supersession and cancellation. Single writer for subscription state; the
/// snapshot cache only ever serves the check endpoint.
pub struct SubscriptionUseCase<P, S, G>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    plan_repo: Arc<P>,
    subscription_repo: Arc<S>,
    gateway: Arc<G>,
    snapshot_cache: Cache<String, SubscriptionSnapshot>,
    settings: SubscriptionSettings,
}

impl<P, S, G> SubscriptionUseCase<P, S, G>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    pub fn new(
        plan_repo: Arc<P>,
        subscription_repo: Arc<S>,
        gateway: Arc<G>,
        snapshot_cache: Cache<String, SubscriptionSnapshot>,
        settings: SubscriptionSettings,
    ) -> Self {
        Self {
            plan_repo,
            subscription_repo,
            gateway,
            snapshot_cache,
            settings,
        }
    }

    pub async fn list_plans(&self) -> SubscriptionResult<Vec<PlanModel>> {
        let plans = self.plan_repo.list_active_plans().await.map_err(|err| {
            error!(db_error = ?err, "subscriptions: failed to list plans");
            SubscriptionError::Internal(err)
        })?;
        Ok(plans.into_iter().map(PlanModel::from).collect())
    }

    pub async fn create_subscription(
        &self,
        request: CreateSubscriptionModel,
    ) -> SubscriptionResult<CreateSubscriptionOutcome> {
        info!(
            user_id = %request.user_id,
            plan_slug = %request.plan_slug,
            force_renew = request.force_renew,
            "subscriptions: create subscription requested"
        );

        let plan = self
            .plan_repo
            .find_active_plan_by_slug(&request.plan_slug)
            .await
            .map_err(|err| {
                error!(
                    plan_slug = %request.plan_slug,
                    db_error = ?err,
                    "subscriptions: failed to load plan"
                );
                SubscriptionError::Internal(err)
            })?
            .ok_or_else(|| {
                let err = SubscriptionError::PlanNotFound;
                warn!(
                    plan_slug = %request.plan_slug,
                    status = err.status_code().as_u16(),
                    "subscriptions: unknown or inactive plan"
                );
                err
            })?;

        let now = Utc::now();
        let active = self.load_active(request.user_id).await?;

        if let Some(current) = active.first() {
            if !request.force_renew {
                let err = SubscriptionError::ActiveSubscriptionExists(Box::new(
                    SubscriptionModel::from(current.clone()),
                ));
                warn!(
                    user_id = %request.user_id,
                    existing_subscription_id = %current.id,
                    status = err.status_code().as_u16(),
                    "subscriptions: active subscription exists, force_renew not set"
                );
                return Err(err);
            }
        }

        let is_trial = plan.price_minor == 0;
        let subscription_id = Uuid::new_v4();
        let transaction_ref =
            (!is_trial).then(|| format!("sub-{}", subscription_id.simple()));
        let status = if is_trial {
            SubscriptionStatus::Active
        } else {
            SubscriptionStatus::Pending
        };
        let ends_at = now + Duration::days(i64::from(plan.duration_days));

        let insert_subscription_entity = InsertSubscriptionEntity {
            id: subscription_id,
            user_id: request.user_id,
            plan_id: plan.id,
            status: status.to_string(),
            starts_at: now,
            ends_at,
            transaction_ref: transaction_ref.clone(),
            amount_minor: plan.price_minor,
            currency: plan.currency.clone(),
        };

        let entity = if request.force_renew && !active.is_empty() {
            let reason = format!("replaced by {}", plan.slug);
            self.subscription_repo
                .supersede_and_insert(request.user_id, &reason, insert_subscription_entity)
                .await
        } else {
            self.subscription_repo.insert(insert_subscription_entity).await
        }
        .map_err(|err| {
            error!(
                user_id = %request.user_id,
                plan_slug = %plan.slug,
                db_error = ?err,
                "subscriptions: failed to persist subscription"
            );
            SubscriptionError::Internal(err)
        })?;

        self.invalidate_snapshots(request.user_id, transaction_ref.as_deref())
            .await;

        let checkout_url = match &transaction_ref {
            Some(transaction_ref) => Some(
                self.create_plan_checkout(&request, &plan, transaction_ref)
                    .await?,
            ),
            None => None,
        };

        let subscription = SubscriptionModel::from(entity);
        info!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            status = %subscription.status,
            "subscriptions: subscription created"
        );
        Ok(CreateSubscriptionOutcome {
            subscription,
            checkout_url,
        })
    }

    pub async fn get_active_subscription(
        &self,
        user_id: Uuid,
    ) -> SubscriptionResult<Option<SubscriptionModel>> {
        let active = self.load_active(user_id).await?;
        Ok(active.into_iter().next().map(SubscriptionModel::from))
    }

    /// Activates a pending subscription once the gateway confirms its payment.
    /// Idempotent per transaction_ref: a duplicate webhook observes the row
    /// already active and returns it unchanged.
    pub async fn confirm_payment(
        &self,
        transaction_ref: &str,
    ) -> SubscriptionResult<SubscriptionModel> {
        info!(transaction_ref, "subscriptions: payment confirmation received");

        let entity = self
            .subscription_repo
            .find_by_transaction_ref(transaction_ref)
            .await
            .map_err(SubscriptionError::Internal)?
            .ok_or_else(|| {
                let err = SubscriptionError::SubscriptionNotFound;
                warn!(
                    transaction_ref,
                    status = err.status_code().as_u16(),
                    "subscriptions: no subscription carries this reference"
                );
                err
            })?;

        match SubscriptionStatus::from_str(&entity.status) {
            SubscriptionStatus::Active => {
                info!(
                    subscription_id = %entity.id,
                    transaction_ref,
                    "subscriptions: already active, confirmation is a no-op"
                );
                return Ok(SubscriptionModel::from(entity));
            }
            SubscriptionStatus::Pending => {}
            status => {
                let err = SubscriptionError::Conflict(format!(
                    "cannot activate a {status} subscription"
                ));
                warn!(
                    subscription_id = %entity.id,
                    subscription_status = %status,
                    status = err.status_code().as_u16(),
                    "subscriptions: confirmation rejected"
                );
                return Err(err);
            }
        }

        let verification = self
            .gateway
            .verify_transaction(transaction_ref)
            .await
            .map_err(|err| {
                error!(
                    transaction_ref,
                    gateway_error = ?err,
                    "subscriptions: gateway verification failed"
                );
                SubscriptionError::GatewayUnavailable(err)
            })?;

        if !verification.verified {
            let err = SubscriptionError::Conflict(
                "payment is not verified, subscription stays pending".to_string(),
            );
            warn!(
                subscription_id = %entity.id,
                transaction_ref,
                status = err.status_code().as_u16(),
                "subscriptions: unverified payment"
            );
            return Err(err);
        }

        // The billing period starts at activation; the pending row's span
        // carries the plan duration.
        let duration = entity.ends_at - entity.starts_at;
        let starts_at = Utc::now();
        let ends_at = starts_at + duration;

        let activated = self
            .subscription_repo
            .activate_pending(entity.id, starts_at, ends_at)
            .await
            .map_err(SubscriptionError::Internal)?;

        self.invalidate_snapshots(entity.user_id, Some(transaction_ref))
            .await;

        match activated {
            Some(entity) => {
                info!(
                    subscription_id = %entity.id,
                    transaction_ref,
                    "subscriptions: subscription activated"
                );
                Ok(SubscriptionModel::from(entity))
            }
            // Lost the race against a concurrent confirmation; re-read.
            None => {
                let current = self
                    .subscription_repo
                    .find_by_transaction_ref(transaction_ref)
                    .await
                    .map_err(SubscriptionError::Internal)?
                    .ok_or(SubscriptionError::SubscriptionNotFound)?;
                if SubscriptionStatus::from_str(&current.status) == SubscriptionStatus::Active {
                    Ok(SubscriptionModel::from(current))
                } else {
                    Err(SubscriptionError::Conflict(
                        "subscription is no longer pending".to_string(),
                    ))
                }
            }
        }
    }

    /// Status snapshot for the check endpoint, served through the injected TTL
    /// cache. `bypass_cache` invalidates and refetches.
    pub async fn check_subscription(
        &self,
        request: CheckSubscriptionModel,
    ) -> SubscriptionResult<SubscriptionSnapshot> {
        let key = match (&request.user_id, &request.transaction_ref) {
            (Some(user_id), _) => format!("user:{user_id}"),
            (None, Some(transaction_ref)) => format!("tx:{transaction_ref}"),
            (None, None) => {
                return Err(SubscriptionError::Validation(
                    "user_id or transaction_ref is required".to_string(),
                ));
            }
        };

        if request.bypass_cache {
            self.snapshot_cache.invalidate(&key).await;
        } else if let Some(snapshot) = self.snapshot_cache.get(&key).await {
            return Ok(snapshot);
        }

        let snapshot = match (request.user_id, request.transaction_ref) {
            (Some(user_id), _) => {
                let subscription = self.get_active_subscription(user_id).await?;
                Self::snapshot_of(subscription)
            }
            (None, Some(transaction_ref)) => {
                let entity = self
                    .subscription_repo
                    .find_by_transaction_ref(&transaction_ref)
                    .await
                    .map_err(SubscriptionError::Internal)?
                    .ok_or(SubscriptionError::SubscriptionNotFound)?;
                Self::snapshot_of(Some(SubscriptionModel::from(entity)))
            }
            (None, None) => unreachable!("validated above"),
        };

        self.snapshot_cache.insert(key, snapshot.clone()).await;
        Ok(snapshot)
    }

    pub async fn cancel_subscription(&self, user_id: Uuid) -> SubscriptionResult<usize> {
        info!(%user_id, "subscriptions: cancel requested");

        let cancelled = self
            .subscription_repo
            .cancel_active_for_user(user_id, "user requested cancellation")
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: cancel failed");
                SubscriptionError::Internal(err)
            })?;

        if cancelled == 0 {
            let err = SubscriptionError::SubscriptionNotFound;
            warn!(
                %user_id,
                status = err.status_code().as_u16(),
                "subscriptions: nothing to cancel"
            );
            return Err(err);
        }

        self.invalidate_snapshots(user_id, None).await;
        info!(%user_id, cancelled, "subscriptions: subscription cancelled");
        Ok(cancelled)
    }

    async fn load_active(
        &self,
        user_id: Uuid,
    ) -> SubscriptionResult<Vec<crate::domain::entities::subscriptions::SubscriptionEntity>> {
        let active = self
            .subscription_repo
            .find_active_for_user(user_id, Utc::now())
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to load active rows");
                SubscriptionError::Internal(err)
            })?;

        // Single-writer semantics guarantee at most one row; more is a data
        // anomaly to alert on. The most recent row stays authoritative and the
        // data is never silently rewritten here.
        if active.len() > 1 {
            error!(
                %user_id,
                active_count = active.len(),
                subscription_ids = ?active.iter().map(|s| s.id).collect::<Vec<_>>(),
                "subscriptions: invariant violation, multiple active subscriptions"
            );
        }
        Ok(active)
    }

    async fn create_plan_checkout(
        &self,
        request: &CreateSubscriptionModel,
        plan: &PlanEntity,
        transaction_ref: &str,
    ) -> SubscriptionResult<String> {
        let email = request
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or_else(|| {
                let err = SubscriptionError::Validation(
                    "email is required for paid plans".to_string(),
                );
                warn!(
                    user_id = %request.user_id,
                    status = err.status_code().as_u16(),
                    "subscriptions: missing email for checkout"
                );
                err
            })?;

        let checkout = CheckoutSessionRequest {
            transaction_ref: transaction_ref.to_string(),
            amount_minor: plan.price_minor,
            currency: plan.currency.clone(),
            email: email.to_string(),
            first_name: request.first_name.clone().unwrap_or_default(),
            last_name: None,
            success_url: format!("{}?tx_ref={}", self.settings.success_url, transaction_ref),
            cancel_url: format!("{}?tx_ref={}", self.settings.cancel_url, transaction_ref),
            metadata: HashMap::from([
                ("user_id".to_string(), request.user_id.to_string()),
                ("plan_slug".to_string(), plan.slug.clone()),
            ]),
        };

        self.gateway
            .create_checkout_session(checkout)
            .await
            .map(|session| session.checkout_url)
            .map_err(|err| {
                error!(
                    user_id = %request.user_id,
                    plan_slug = %plan.slug,
                    transaction_ref,
                    gateway_error = ?err,
                    "subscriptions: checkout session creation failed"
                );
                SubscriptionError::GatewayUnavailable(err)
            })
    }

    async fn invalidate_snapshots(&self, user_id: Uuid, transaction_ref: Option<&str>) {
        self.snapshot_cache
            .invalidate(&format!("user:{user_id}"))
            .await;
        if let Some(transaction_ref) = transaction_ref {
            self.snapshot_cache
                .invalidate(&format!("tx:{transaction_ref}"))
                .await;
        }
    }

    fn snapshot_of(subscription: Option<SubscriptionModel>) -> SubscriptionSnapshot {
        match subscription {
            Some(subscription) => SubscriptionSnapshot {
                status: subscription.status,
                plan_id: Some(subscription.plan_id),
                ends_at: Some(subscription.ends_at),
                checked_at: Utc::now(),
            },
            None => SubscriptionSnapshot {
                status: SubscriptionStatus::Expired,
                plan_id: None,
                ends_at: None,
                checked_at: Utc::now(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::usecases::payments::{CheckoutSession, MockPaymentGateway,
            TransactionVerification},
        domain::{
            entities::subscriptions::SubscriptionEntity,
            repositories::{
                plans::MockPlanRepository, subscriptions::MockSubscriptionRepository,
            },
        },
    };
    use std::time::Duration as StdDuration;

    fn sample_plan(slug: &str, price_minor: i64, duration_days: i32) -> PlanEntity {
        PlanEntity {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            price_minor,
            currency: "ETB".to_string(),
            duration_days,
            max_events: Some(10),
            max_attendees_per_event: Some(500),
            is_active: true,
        }
    }

    fn entity_from_insert(insert: InsertSubscriptionEntity) -> SubscriptionEntity {
        SubscriptionEntity {
            id: insert.id,
            user_id: insert.user_id,
            plan_id: insert.plan_id,
            status: insert.status,
            starts_at: insert.starts_at,
            ends_at: insert.ends_at,
            transaction_ref: insert.transaction_ref,
            amount_minor: insert.amount_minor,
            currency: insert.currency,
            cancel_reason: None,
            created_at: Utc::now(),
        }
    }

    fn active_entity(user_id: Uuid) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            plan_id: Uuid::new_v4(),
            status: "active".to_string(),
            starts_at: now - Duration::days(5),
            ends_at: now + Duration::days(25),
            transaction_ref: Some("sub-existing".to_string()),
            amount_minor: 20_000,
            currency: "ETB".to_string(),
            cancel_reason: None,
            created_at: now - Duration::days(5),
        }
    }

    fn snapshot_cache() -> Cache<String, SubscriptionSnapshot> {
        Cache::builder()
            .time_to_live(StdDuration::from_secs(300))
            .max_capacity(1_000)
            .build()
    }

    fn settings() -> SubscriptionSettings {
        SubscriptionSettings {
            success_url: "https://tikera.example/plans/success".to_string(),
            cancel_url: "https://tikera.example/plans/cancel".to_string(),
        }
    }

    fn usecase(
        plan_repo: MockPlanRepository,
        subscription_repo: MockSubscriptionRepository,
        gateway: MockPaymentGateway,
    ) -> SubscriptionUseCase<MockPlanRepository, MockSubscriptionRepository, MockPaymentGateway>
    {
        SubscriptionUseCase::new(
            Arc::new(plan_repo),
            Arc::new(subscription_repo),
            Arc::new(gateway),
            snapshot_cache(),
            settings(),
        )
    }

    fn create_request(user_id: Uuid, plan_slug: &str, force_renew: bool) -> CreateSubscriptionModel {
        CreateSubscriptionModel {
            user_id,
            plan_slug: plan_slug.to_string(),
            force_renew,
            email: Some("organizer@example.com".to_string()),
            first_name: Some("Hana".to_string()),
        }
    }

    #[tokio::test]
    async fn trial_plan_activates_immediately_without_gateway() {
        let user_id = Uuid::new_v4();
        let plan = sample_plan("trial", 0, 14);

        let mut plan_repo = MockPlanRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        let gateway = MockPaymentGateway::new();

        plan_repo.expect_find_active_plan_by_slug().returning(move |_| {
            let plan = plan.clone();
            Box::pin(async move { Ok(Some(plan)) })
        });
        subscription_repo
            .expect_find_active_for_user()
            .returning(|_, _| Box::pin(async { Ok(vec![]) }));
        subscription_repo
            .expect_insert()
            .times(1)
            .returning(|insert| Box::pin(async move { Ok(entity_from_insert(insert)) }));

        let usecase = usecase(plan_repo, subscription_repo, gateway);
        let before = Utc::now();
        let outcome = usecase
            .create_subscription(create_request(user_id, "trial", false))
            .await
            .unwrap();

        assert_eq!(outcome.subscription.status, SubscriptionStatus::Active);
        assert_eq!(outcome.subscription.amount_minor, 0);
        assert!(outcome.checkout_url.is_none());
        let expected_end = before + Duration::days(14);
        let delta = (outcome.subscription.ends_at - expected_end).num_seconds().abs();
        assert!(delta <= 2, "trial period should be 14 days, delta {delta}s");
    }

    #[tokio::test]
    async fn active_subscription_blocks_create_without_force_renew() {
        let user_id = Uuid::new_v4();
        let existing = active_entity(user_id);
        let existing_id = existing.id;
        let plan = sample_plan("pro", 20_000, 30);

        let mut plan_repo = MockPlanRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        let gateway = MockPaymentGateway::new();

        plan_repo.expect_find_active_plan_by_slug().returning(move |_| {
            let plan = plan.clone();
            Box::pin(async move { Ok(Some(plan)) })
        });
        subscription_repo
            .expect_find_active_for_user()
            .returning(move |_, _| {
                let existing = existing.clone();
                Box::pin(async move { Ok(vec![existing]) })
            });
        subscription_repo.expect_insert().times(0);
        subscription_repo.expect_supersede_and_insert().times(0);

        let usecase = usecase(plan_repo, subscription_repo, gateway);
        let err = usecase
            .create_subscription(create_request(user_id, "pro", false))
            .await
            .unwrap_err();

        match err {
            SubscriptionError::ActiveSubscriptionExists(existing) => {
                assert_eq!(existing.id, existing_id);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn force_renew_supersedes_prior_subscriptions() {
        let user_id = Uuid::new_v4();
        let existing = active_entity(user_id);
        let plan = sample_plan("trial", 0, 14);

        let mut plan_repo = MockPlanRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        let gateway = MockPaymentGateway::new();

        plan_repo.expect_find_active_plan_by_slug().returning(move |_| {
            let plan = plan.clone();
            Box::pin(async move { Ok(Some(plan)) })
        });
        subscription_repo
            .expect_find_active_for_user()
            .returning(move |_, _| {
                let existing = existing.clone();
                Box::pin(async move { Ok(vec![existing]) })
            });
        subscription_repo
            .expect_supersede_and_insert()
            .withf(move |id, reason, _| *id == user_id && reason == "replaced by trial")
            .times(1)
            .returning(|_, _, insert| Box::pin(async move { Ok(entity_from_insert(insert)) }));

        let usecase = usecase(plan_repo, subscription_repo, gateway);
        let outcome = usecase
            .create_subscription(create_request(user_id, "trial", true))
            .await
            .unwrap();

        assert_eq!(outcome.subscription.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn paid_plan_creates_pending_subscription_with_checkout_url() {
        let user_id = Uuid::new_v4();
        let plan = sample_plan("pro", 20_000, 30);

        let mut plan_repo = MockPlanRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        let mut gateway = MockPaymentGateway::new();

        plan_repo.expect_find_active_plan_by_slug().returning(move |_| {
            let plan = plan.clone();
            Box::pin(async move { Ok(Some(plan)) })
        });
        subscription_repo
            .expect_find_active_for_user()
            .returning(|_, _| Box::pin(async { Ok(vec![]) }));
        subscription_repo
            .expect_insert()
            .times(1)
            .returning(|insert| Box::pin(async move { Ok(entity_from_insert(insert)) }));
        gateway
            .expect_create_checkout_session()
            .withf(|request| {
                request.amount_minor == 20_000 && request.transaction_ref.starts_with("sub-")
            })
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    Ok(CheckoutSession {
                        checkout_url: "https://checkout.chapa.co/session/sub".to_string(),
                    })
                })
            });

        let usecase = usecase(plan_repo, subscription_repo, gateway);
        let outcome = usecase
            .create_subscription(create_request(user_id, "pro", false))
            .await
            .unwrap();

        assert_eq!(outcome.subscription.status, SubscriptionStatus::Pending);
        assert_eq!(
            outcome.checkout_url.as_deref(),
            Some("https://checkout.chapa.co/session/sub")
        );
        assert!(outcome
            .subscription
            .transaction_ref
            .as_deref()
            .unwrap()
            .starts_with("sub-"));
    }

    #[tokio::test]
    async fn multiple_active_rows_resolve_to_most_recent() {
        let user_id = Uuid::new_v4();
        let newer = active_entity(user_id);
        let mut older = active_entity(user_id);
        older.created_at = newer.created_at - Duration::days(10);
        let newer_id = newer.id;

        let mut plan_repo = MockPlanRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        let gateway = MockPaymentGateway::new();

        plan_repo.expect_find_active_plan_by_slug().times(0);
        subscription_repo
            .expect_find_active_for_user()
            .returning(move |_, _| {
                let rows = vec![newer.clone(), older.clone()];
                Box::pin(async move { Ok(rows) })
            });

        let usecase = usecase(plan_repo, subscription_repo, gateway);
        let subscription = usecase.get_active_subscription(user_id).await.unwrap();
        assert_eq!(subscription.unwrap().id, newer_id);
    }

    #[tokio::test]
    async fn confirm_payment_activates_pending_subscription() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let pending = SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            plan_id: Uuid::new_v4(),
            status: "pending".to_string(),
            starts_at: now,
            ends_at: now + Duration::days(30),
            transaction_ref: Some("sub-abc".to_string()),
            amount_minor: 20_000,
            currency: "ETB".to_string(),
            cancel_reason: None,
            created_at: now,
        };

        let plan_repo = MockPlanRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        let mut gateway = MockPaymentGateway::new();

        subscription_repo
            .expect_find_by_transaction_ref()
            .returning(move |_| {
                let pending = pending.clone();
                Box::pin(async move { Ok(Some(pending)) })
            });
        gateway.expect_verify_transaction().times(1).returning(|_| {
            Box::pin(async {
                Ok(TransactionVerification {
                    verified: true,
                    amount_minor: 20_000,
                    currency: "ETB".to_string(),
                })
            })
        });
        subscription_repo
            .expect_activate_pending()
            .times(1)
            .returning(|id, starts_at, ends_at| {
                Box::pin(async move {
                    Ok(Some(SubscriptionEntity {
                        id,
                        user_id: Uuid::new_v4(),
                        plan_id: Uuid::new_v4(),
                        status: "active".to_string(),
                        starts_at,
                        ends_at,
                        transaction_ref: Some("sub-abc".to_string()),
                        amount_minor: 20_000,
                        currency: "ETB".to_string(),
                        cancel_reason: None,
                        created_at: starts_at,
                    }))
                })
            });

        let usecase = usecase(plan_repo, subscription_repo, gateway);
        let subscription = usecase.confirm_payment("sub-abc").await.unwrap();

        assert_eq!(subscription.status, SubscriptionStatus::Active);
        let period = (subscription.ends_at - subscription.starts_at).num_days();
        assert_eq!(period, 30);
    }

    #[tokio::test]
    async fn duplicate_confirmation_is_a_noop_without_gateway_call() {
        let user_id = Uuid::new_v4();
        let mut active = active_entity(user_id);
        active.transaction_ref = Some("sub-abc".to_string());

        let plan_repo = MockPlanRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        let mut gateway = MockPaymentGateway::new();

        subscription_repo
            .expect_find_by_transaction_ref()
            .returning(move |_| {
                let active = active.clone();
                Box::pin(async move { Ok(Some(active)) })
            });
        gateway.expect_verify_transaction().times(0);

        let usecase = usecase(plan_repo, subscription_repo, gateway);
        let subscription = usecase.confirm_payment("sub-abc").await.unwrap();
        assert_eq!(subscription.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn check_serves_second_read_from_cache() {
        let user_id = Uuid::new_v4();
        let existing = active_entity(user_id);

        let plan_repo = MockPlanRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        let gateway = MockPaymentGateway::new();

        subscription_repo
            .expect_find_active_for_user()
            .times(1)
            .returning(move |_, _| {
                let existing = existing.clone();
                Box::pin(async move { Ok(vec![existing]) })
            });

        let usecase = usecase(plan_repo, subscription_repo, gateway);
        let request = CheckSubscriptionModel {
            user_id: Some(user_id),
            transaction_ref: None,
            bypass_cache: false,
        };

        let first = usecase.check_subscription(request.clone()).await.unwrap();
        let second = usecase.check_subscription(request).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn bypass_flag_refetches_from_the_repository() {
        let user_id = Uuid::new_v4();
        let existing = active_entity(user_id);

        let plan_repo = MockPlanRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        let gateway = MockPaymentGateway::new();

        subscription_repo
            .expect_find_active_for_user()
            .times(2)
            .returning(move |_, _| {
                let existing = existing.clone();
                Box::pin(async move { Ok(vec![existing]) })
            });

        let usecase = usecase(plan_repo, subscription_repo, gateway);
        let request = CheckSubscriptionModel {
            user_id: Some(user_id),
            transaction_ref: None,
            bypass_cache: true,
        };

        usecase.check_subscription(request.clone()).await.unwrap();
        usecase.check_subscription(request).await.unwrap();
    }
}
