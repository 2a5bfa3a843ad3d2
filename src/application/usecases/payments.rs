use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    application::usecases::orders::{OrderError, OrderUseCase},
    domain::{
        repositories::{events::EventRepository, orders::OrderRepository},
        value_objects::{enums::order_statuses::OrderStatus, orders::OrderModel},
    },
};

/// External payment processor boundary. The production implementation is the
/// Chapa client; tests substitute a mock.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> AnyResult<CheckoutSession>;

    async fn verify_transaction(&self, transaction_ref: &str)
    -> AnyResult<TransactionVerification>;

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str)
    -> AnyResult<WebhookEvent>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSessionRequest {
    pub transaction_ref: String,
    pub amount_minor: i64,
    pub currency: String,
    pub email: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub checkout_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionVerification {
    pub verified: bool,
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub transaction_ref: String,
    pub status: String,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("invalid payment request: {0}")]
    Validation(String),
    #[error("payment state conflict: {0}")]
    Conflict(String),
    #[error("invalid webhook: {0}")]
    InvalidWebhook(String),
    #[error("payment gateway unavailable")]
    GatewayUnavailable(#[source] anyhow::Error),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Internal(anyhow::Error),
}

impl PaymentError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            PaymentError::Validation(_) | PaymentError::InvalidWebhook(_) => {
                StatusCode::BAD_REQUEST
            }
            PaymentError::Conflict(_) => StatusCode::CONFLICT,
            PaymentError::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            PaymentError::Order(err) => err.status_code(),
            PaymentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type PaymentResult<T> = std::result::Result<T, PaymentError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitiateCheckoutOutcome {
    pub redirect_url: String,
    pub transaction_ref: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    OrderConfirmed(OrderModel),
    /// Signature checked but the gateway does not report the charge as
    /// settled; the order stays pending and recoverable.
    Unverified { transaction_ref: String },
    /// No order carries this reference; the caller may route it to the
    /// subscription flow.
    UnmatchedTransaction { transaction_ref: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerifyPaymentOutcome {
    Confirmed { order: OrderModel },
    Pending,
    /// Bounded polling exhausted without a gateway answer. Terminal for the
    /// client: "payment status unknown, contact support".
    Unknown,
}

#[derive(Debug, Clone)]
pub struct PaymentSettings {
    /// Gateway return URLs; the opaque order id is the only state appended.
    pub success_url: String,
    pub cancel_url: String,
    pub poll_attempts: u32,
    pub poll_backoff: Duration,
}

/// Payment gateway adapter: checkout initiation, webhook consumption and the
/// polling fallback. Never transitions an order on initiation alone.
pub struct PaymentUseCase<E, O, G>
where
    E: EventRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    order_usecase: Arc<OrderUseCase<E, O>>,
    order_repo: Arc<O>,
    gateway: Arc<G>,
    settings: PaymentSettings,
}

impl<E, O, G> PaymentUseCase<E, O, G>
where
    E: EventRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    pub fn new(
        order_usecase: Arc<OrderUseCase<E, O>>,
        order_repo: Arc<O>,
        gateway: Arc<G>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            order_usecase,
            order_repo,
            gateway,
            settings,
        }
    }

    /// The reference is derived from the order id, so re-initiating checkout
    /// for the same order reuses the same gateway session key.
    pub fn transaction_ref_for(order_id: Uuid) -> String {
        format!("order-{}", order_id.simple())
    }

    pub async fn initiate_checkout(
        &self,
        order_id: Uuid,
    ) -> PaymentResult<InitiateCheckoutOutcome> {
        info!(%order_id, "payments: initiate checkout requested");

        let order = self.order_usecase.get_order(order_id).await?;
        if order.status != OrderStatus::Pending {
            let err = PaymentError::Conflict(format!(
                "order is not awaiting payment, status is {}",
                order.status
            ));
            warn!(
                %order_id,
                order_status = %order.status,
                status = err.status_code().as_u16(),
                "payments: checkout rejected for non-pending order"
            );
            return Err(err);
        }
        if order.total_amount_minor <= 0 {
            let err =
                PaymentError::Validation("free orders do not require checkout".to_string());
            warn!(
                %order_id,
                status = err.status_code().as_u16(),
                "payments: checkout attempted for zero-total order"
            );
            return Err(err);
        }

        let transaction_ref = Self::transaction_ref_for(order.id);
        self.order_repo
            .set_transaction_ref(order.id, &transaction_ref)
            .await
            .map_err(|err| {
                error!(
                    %order_id,
                    db_error = ?err,
                    "payments: failed to stamp transaction reference"
                );
                PaymentError::Internal(err)
            })?;

        let metadata = HashMap::from([
            ("order_id".to_string(), order.id.to_string()),
            ("event_id".to_string(), order.event_id.to_string()),
        ]);
        let request = CheckoutSessionRequest {
            transaction_ref: transaction_ref.clone(),
            amount_minor: order.total_amount_minor,
            currency: order.currency.clone(),
            email: order.buyer.email.clone(),
            first_name: order.buyer.first_name.clone(),
            last_name: order.buyer.last_name.clone(),
            success_url: format!("{}?order_id={}", self.settings.success_url, order.id),
            cancel_url: format!("{}?order_id={}", self.settings.cancel_url, order.id),
            metadata,
        };

        // One attempt only; the client retries with backoff on 502.
        let session = self
            .gateway
            .create_checkout_session(request)
            .await
            .map_err(|err| {
                error!(
                    %order_id,
                    transaction_ref = %transaction_ref,
                    gateway_error = ?err,
                    "payments: checkout session creation failed"
                );
                PaymentError::GatewayUnavailable(err)
            })?;

        info!(
            %order_id,
            transaction_ref = %transaction_ref,
            "payments: checkout session created"
        );
        Ok(InitiateCheckoutOutcome {
            redirect_url: session.checkout_url,
            transaction_ref,
        })
    }

    /// Consumes a gateway callback. The signed payload is only a hint: the
    /// transaction is re-verified against the gateway before any order
    /// transition. Duplicate deliveries collapse into the idempotent confirm.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> PaymentResult<WebhookOutcome> {
        let event = self
            .gateway
            .verify_webhook_signature(payload, signature)
            .map_err(|err| {
                warn!(error = %err, "payments: webhook signature verification failed");
                PaymentError::InvalidWebhook("signature verification failed".to_string())
            })?;

        info!(
            transaction_ref = %event.transaction_ref,
            gateway_status = %event.status,
            "payments: webhook received"
        );

        let verification = self
            .gateway
            .verify_transaction(&event.transaction_ref)
            .await
            .map_err(|err| {
                error!(
                    transaction_ref = %event.transaction_ref,
                    gateway_error = ?err,
                    "payments: webhook transaction verification failed"
                );
                PaymentError::GatewayUnavailable(err)
            })?;

        if !verification.verified {
            warn!(
                transaction_ref = %event.transaction_ref,
                "payments: webhook transaction not verified, order left pending"
            );
            return Ok(WebhookOutcome::Unverified {
                transaction_ref: event.transaction_ref,
            });
        }

        let order_entity = self
            .order_repo
            .find_by_transaction_ref(&event.transaction_ref)
            .await
            .map_err(PaymentError::Internal)?;

        let Some(order_entity) = order_entity else {
            info!(
                transaction_ref = %event.transaction_ref,
                "payments: no order carries this reference"
            );
            return Ok(WebhookOutcome::UnmatchedTransaction {
                transaction_ref: event.transaction_ref,
            });
        };

        if order_entity.total_amount_minor != verification.amount_minor {
            let err = PaymentError::InvalidWebhook(format!(
                "verified amount {} does not match order total {}",
                verification.amount_minor, order_entity.total_amount_minor
            ));
            warn!(
                order_id = %order_entity.id,
                transaction_ref = %event.transaction_ref,
                status = err.status_code().as_u16(),
                "payments: amount mismatch on webhook"
            );
            return Err(err);
        }

        let order = self
            .order_usecase
            .confirm_order(order_entity.id, &event.transaction_ref)
            .await?;
        Ok(WebhookOutcome::OrderConfirmed(order))
    }

    /// Polling fallback for the payment-return page when no webhook has
    /// arrived. Bounded attempts with linear backoff; exhaustion is a terminal
    /// `Unknown` for the caller, never an infinite poll.
    pub async fn verify_payment(&self, order_id: Uuid) -> PaymentResult<VerifyPaymentOutcome> {
        let order = self.order_usecase.get_order(order_id).await?;
        match order.status {
            OrderStatus::Confirmed => return Ok(VerifyPaymentOutcome::Confirmed { order }),
            OrderStatus::Pending => {}
            status => {
                let err = PaymentError::Conflict(format!(
                    "order is {status} and cannot be verified"
                ));
                warn!(
                    %order_id,
                    order_status = %status,
                    status = err.status_code().as_u16(),
                    "payments: verify rejected for terminal order"
                );
                return Err(err);
            }
        }

        let Some(transaction_ref) = order.transaction_ref.clone() else {
            let err =
                PaymentError::Validation("payment was never initiated for this order".to_string());
            warn!(
                %order_id,
                status = err.status_code().as_u16(),
                "payments: verify attempted before checkout"
            );
            return Err(err);
        };

        for attempt in 1..=self.settings.poll_attempts {
            match self.gateway.verify_transaction(&transaction_ref).await {
                Ok(verification) if verification.verified => {
                    let order = self
                        .order_usecase
                        .confirm_order(order_id, &transaction_ref)
                        .await?;
                    info!(
                        %order_id,
                        transaction_ref = %transaction_ref,
                        attempt,
                        "payments: poll verified and confirmed order"
                    );
                    return Ok(VerifyPaymentOutcome::Confirmed { order });
                }
                Ok(_) => {
                    info!(
                        %order_id,
                        transaction_ref = %transaction_ref,
                        attempt,
                        "payments: transaction not settled yet"
                    );
                }
                Err(err) => {
                    warn!(
                        %order_id,
                        transaction_ref = %transaction_ref,
                        attempt,
                        gateway_error = ?err,
                        "payments: poll attempt failed"
                    );
                }
            }

            if attempt < self.settings.poll_attempts {
                tokio::time::sleep(self.settings.poll_backoff * attempt).await;
            }
        }

        warn!(
            %order_id,
            transaction_ref = %transaction_ref,
            attempts = self.settings.poll_attempts,
            "payments: poll exhausted, payment status unknown"
        );
        Ok(VerifyPaymentOutcome::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entities::orders::OrderEntity,
        repositories::{events::MockEventRepository, orders::MockOrderRepository},
    };
    use chrono::Utc;

    fn settings() -> PaymentSettings {
        PaymentSettings {
            success_url: "https://tikera.example/payment/success".to_string(),
            cancel_url: "https://tikera.example/payment/cancel".to_string(),
            poll_attempts: 3,
            poll_backoff: Duration::ZERO,
        }
    }

    fn order_entity(
        order_id: Uuid,
        status: &str,
        total_amount_minor: i64,
        transaction_ref: Option<&str>,
    ) -> OrderEntity {
        OrderEntity {
            id: order_id,
            event_id: Uuid::new_v4(),
            first_name: "Sara".to_string(),
            last_name: None,
            email: "sara@example.com".to_string(),
            phone: None,
            order_type: if total_amount_minor == 0 {
                "free_virtual_rsvp".to_string()
            } else {
                "paid_ticket".to_string()
            },
            items: if total_amount_minor == 0 {
                serde_json::json!([])
            } else {
                serde_json::json!([{
                    "ticket_id": "regular",
                    "name": "Regular",
                    "unit_price_minor": total_amount_minor / 2,
                    "quantity": 2
                }])
            },
            total_amount_minor,
            currency: "ETB".to_string(),
            status: status.to_string(),
            transaction_ref: transaction_ref.map(str::to_string),
            created_at: Utc::now(),
            confirmed_at: if status == "confirmed" {
                Some(Utc::now())
            } else {
                None
            },
        }
    }

    fn usecase(
        order_repo: MockOrderRepository,
        gateway: MockPaymentGateway,
    ) -> PaymentUseCase<MockEventRepository, MockOrderRepository, MockPaymentGateway> {
        let order_repo = Arc::new(order_repo);
        let order_usecase = Arc::new(OrderUseCase::new(
            Arc::new(MockEventRepository::new()),
            Arc::clone(&order_repo),
        ));
        PaymentUseCase::new(order_usecase, order_repo, Arc::new(gateway), settings())
    }

    #[tokio::test]
    async fn checkout_rejects_zero_total_orders_without_gateway_call() {
        let order_id = Uuid::new_v4();

        let mut order_repo = MockOrderRepository::new();
        order_repo.expect_find_by_id().returning(move |id| {
            Box::pin(async move { Ok(Some(order_entity(id, "pending", 0, None))) })
        });

        let gateway = MockPaymentGateway::new();
        let usecase = usecase(order_repo, gateway);

        let err = usecase.initiate_checkout(order_id).await.unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }

    #[tokio::test]
    async fn checkout_returns_redirect_and_stamps_reference() {
        let order_id = Uuid::new_v4();
        let expected_ref = PaymentUseCase::<
            MockEventRepository,
            MockOrderRepository,
            MockPaymentGateway,
        >::transaction_ref_for(order_id);

        let mut order_repo = MockOrderRepository::new();
        order_repo.expect_find_by_id().returning(move |id| {
            Box::pin(async move { Ok(Some(order_entity(id, "pending", 100_000, None))) })
        });
        let stamped_ref = expected_ref.clone();
        order_repo
            .expect_set_transaction_ref()
            .withf(move |_, transaction_ref| transaction_ref == stamped_ref)
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_checkout_session()
            .withf(move |request| {
                request.amount_minor == 100_000
                    && request.currency == "ETB"
                    && request.success_url.contains(&order_id.to_string())
            })
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    Ok(CheckoutSession {
                        checkout_url: "https://checkout.chapa.co/session/abc".to_string(),
                    })
                })
            });

        let usecase = usecase(order_repo, gateway);
        let outcome = usecase.initiate_checkout(order_id).await.unwrap();

        assert_eq!(
            outcome.redirect_url,
            "https://checkout.chapa.co/session/abc"
        );
        assert_eq!(outcome.transaction_ref, expected_ref);
    }

    #[tokio::test]
    async fn gateway_failure_surfaces_and_order_stays_pending() {
        let order_id = Uuid::new_v4();

        let mut order_repo = MockOrderRepository::new();
        order_repo.expect_find_by_id().returning(move |id| {
            Box::pin(async move { Ok(Some(order_entity(id, "pending", 100_000, None))) })
        });
        order_repo
            .expect_set_transaction_ref()
            .returning(|_, _| Box::pin(async { Ok(()) }));
        // No confirm may ever run on an initiation failure.
        order_repo.expect_confirm_pending().times(0);

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_checkout_session()
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("connection refused")) }));

        let usecase = usecase(order_repo, gateway);
        let err = usecase.initiate_checkout(order_id).await.unwrap_err();
        assert!(matches!(err, PaymentError::GatewayUnavailable(_)));
    }

    #[tokio::test]
    async fn webhook_verifies_then_confirms_matching_order() {
        let order_id = Uuid::new_v4();

        let mut order_repo = MockOrderRepository::new();
        order_repo
            .expect_find_by_transaction_ref()
            .returning(move |transaction_ref| {
                let transaction_ref = transaction_ref.to_string();
                Box::pin(async move {
                    Ok(Some(order_entity(
                        order_id,
                        "pending",
                        100_000,
                        Some(&transaction_ref),
                    )))
                })
            });
        order_repo.expect_find_by_id().returning(move |id| {
            Box::pin(async move { Ok(Some(order_entity(id, "pending", 100_000, Some("tx123")))) })
        });
        order_repo
            .expect_confirm_pending()
            .times(1)
            .returning(|id, transaction_ref, _| {
                let transaction_ref = transaction_ref.to_string();
                Box::pin(async move {
                    let mut entity =
                        order_entity(id, "confirmed", 100_000, Some(&transaction_ref));
                    entity.confirmed_at = Some(Utc::now());
                    Ok(Some(entity))
                })
            });

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| {
                Ok(WebhookEvent {
                    transaction_ref: "tx123".to_string(),
                    status: "success".to_string(),
                })
            });
        gateway.expect_verify_transaction().times(1).returning(|_| {
            Box::pin(async {
                Ok(TransactionVerification {
                    verified: true,
                    amount_minor: 100_000,
                    currency: "ETB".to_string(),
                })
            })
        });

        let usecase = usecase(order_repo, gateway);
        let outcome = usecase.handle_webhook(b"{}", "sig").await.unwrap();

        match outcome {
            WebhookOutcome::OrderConfirmed(order) => {
                assert_eq!(order.status, OrderStatus::Confirmed);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_webhook_returns_existing_order_unchanged() {
        let order_id = Uuid::new_v4();
        let confirmed = order_entity(order_id, "confirmed", 100_000, Some("tx123"));
        let original_confirmed_at = confirmed.confirmed_at;

        let mut order_repo = MockOrderRepository::new();
        let by_ref = confirmed.clone();
        order_repo
            .expect_find_by_transaction_ref()
            .returning(move |_| {
                let entity = by_ref.clone();
                Box::pin(async move { Ok(Some(entity)) })
            });
        order_repo.expect_find_by_id().returning(move |_| {
            let entity = confirmed.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });
        order_repo.expect_confirm_pending().times(0);

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| {
                Ok(WebhookEvent {
                    transaction_ref: "tx123".to_string(),
                    status: "success".to_string(),
                })
            });
        gateway.expect_verify_transaction().returning(|_| {
            Box::pin(async {
                Ok(TransactionVerification {
                    verified: true,
                    amount_minor: 100_000,
                    currency: "ETB".to_string(),
                })
            })
        });

        let usecase = usecase(order_repo, gateway);
        let outcome = usecase.handle_webhook(b"{}", "sig").await.unwrap();

        match outcome {
            WebhookOutcome::OrderConfirmed(order) => {
                assert_eq!(order.confirmed_at, original_confirmed_at);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unmatched_transaction_is_reported_for_subscription_routing() {
        let mut order_repo = MockOrderRepository::new();
        order_repo
            .expect_find_by_transaction_ref()
            .returning(|_| Box::pin(async { Ok(None) }));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| {
                Ok(WebhookEvent {
                    transaction_ref: "sub-abc".to_string(),
                    status: "success".to_string(),
                })
            });
        gateway.expect_verify_transaction().returning(|_| {
            Box::pin(async {
                Ok(TransactionVerification {
                    verified: true,
                    amount_minor: 20_000,
                    currency: "ETB".to_string(),
                })
            })
        });

        let usecase = usecase(order_repo, gateway);
        let outcome = usecase.handle_webhook(b"{}", "sig").await.unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::UnmatchedTransaction {
                transaction_ref: "sub-abc".to_string()
            }
        );
    }

    #[tokio::test]
    async fn poll_exhaustion_is_a_terminal_unknown() {
        let order_id = Uuid::new_v4();

        let mut order_repo = MockOrderRepository::new();
        order_repo.expect_find_by_id().returning(move |id| {
            Box::pin(async move { Ok(Some(order_entity(id, "pending", 100_000, Some("tx123")))) })
        });

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_verify_transaction()
            .times(3)
            .returning(|_| {
                Box::pin(async {
                    Ok(TransactionVerification {
                        verified: false,
                        amount_minor: 0,
                        currency: "ETB".to_string(),
                    })
                })
            });

        let usecase = usecase(order_repo, gateway);
        let outcome = usecase.verify_payment(order_id).await.unwrap();
        assert_eq!(outcome, VerifyPaymentOutcome::Unknown);
    }
}
