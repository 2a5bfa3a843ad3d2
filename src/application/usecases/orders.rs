use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    entities::{events::EventEntity, orders::InsertOrderEntity},
    repositories::{events::EventRepository, orders::OrderRepository},
    value_objects::{
        enums::{delivery_modes::DeliveryMode, order_statuses::OrderStatus, order_types::OrderType},
        orders::{CreateOrderModel, OrderDetailsModel, OrderItem, OrderModel},
    },
};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("invalid order request: {0}")]
    Validation(String),
    #[error("event not found")]
    EventNotFound,
    #[error("order not found")]
    OrderNotFound,
    #[error("event is at capacity")]
    CapacityExceeded,
    #[error("order state conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl OrderError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            OrderError::Validation(_) => StatusCode::BAD_REQUEST,
            OrderError::EventNotFound | OrderError::OrderNotFound => StatusCode::NOT_FOUND,
            OrderError::CapacityExceeded | OrderError::Conflict(_) => StatusCode::CONFLICT,
            OrderError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type OrderResult<T> = std::result::Result<T, OrderError>;

/// Sole writer of order state. Free orders confirm synchronously at creation;
/// paid orders stay pending until the payment flow confirms them.
pub struct OrderUseCase<E, O>
where
    E: EventRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
{
    event_repo: Arc<E>,
    order_repo: Arc<O>,
}

impl<E, O> OrderUseCase<E, O>
where
    E: EventRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
{
    pub fn new(event_repo: Arc<E>, order_repo: Arc<O>) -> Self {
        Self {
            event_repo,
            order_repo,
        }
    }

    pub async fn create_order(&self, request: CreateOrderModel) -> OrderResult<OrderModel> {
        info!(
            event_id = %request.event_id,
            order_type = %request.order_type,
            "orders: create order requested"
        );

        Self::validate_buyer(&request)?;

        let event = self
            .event_repo
            .find_by_id(request.event_id)
            .await
            .map_err(|err| {
                error!(
                    event_id = %request.event_id,
                    db_error = ?err,
                    "orders: failed to load event"
                );
                OrderError::Internal(err)
            })?
            .filter(|event| event.is_published)
            .ok_or_else(|| {
                let err = OrderError::EventNotFound;
                warn!(
                    event_id = %request.event_id,
                    status = err.status_code().as_u16(),
                    "orders: event not found or unpublished"
                );
                err
            })?;

        Self::validate_order_type(&request, &event)?;
        let items = Self::validate_items(&request)?;
        let total_amount_minor: i64 = items
            .iter()
            .map(|item| item.unit_price_minor * i64::from(item.quantity))
            .sum();
        let seats = Self::seat_count(&items);

        self.check_capacity(&event, seats).await?;

        let now = Utc::now();
        let is_free = total_amount_minor == 0;
        let status = if is_free {
            OrderStatus::Confirmed
        } else {
            OrderStatus::Pending
        };

        let insert_order_entity = InsertOrderEntity {
            id: Uuid::new_v4(),
            event_id: event.id,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name,
            email: request.email.trim().to_string(),
            phone: request.phone,
            order_type: request.order_type.to_string(),
            items: serde_json::to_value(&items).map_err(|err| {
                OrderError::Internal(anyhow::anyhow!("failed to serialize order items: {err}"))
            })?,
            total_amount_minor,
            currency: event.currency.clone(),
            status: status.to_string(),
            transaction_ref: None,
            confirmed_at: is_free.then_some(now),
        };

        let entity = self
            .order_repo
            .insert(insert_order_entity)
            .await
            .map_err(|err| {
                error!(
                    event_id = %event.id,
                    db_error = ?err,
                    "orders: failed to insert order"
                );
                OrderError::Internal(err)
            })?;

        let order = OrderModel::try_from(entity).map_err(OrderError::Internal)?;
        info!(
            order_id = %order.id,
            event_id = %order.event_id,
            status = %order.status,
            total_amount_minor = order.total_amount_minor,
            "orders: order created"
        );
        Ok(order)
    }

    /// Confirms a pending order against a gateway transaction reference.
    /// Idempotent per transaction_ref: webhook delivery is at-least-once and a
    /// poll may race the webhook, so the pending transition is a conditional
    /// update and repeats observe the already-confirmed row.
    pub async fn confirm_order(
        &self,
        order_id: Uuid,
        transaction_ref: &str,
    ) -> OrderResult<OrderModel> {
        info!(%order_id, transaction_ref, "orders: confirm order requested");

        let order = self.load_order(order_id).await?;
        match order.status {
            OrderStatus::Pending => {
                let confirmed = self
                    .order_repo
                    .confirm_pending(order_id, transaction_ref, Utc::now())
                    .await
                    .map_err(|err| {
                        error!(
                            %order_id,
                            db_error = ?err,
                            "orders: conditional confirm failed"
                        );
                        OrderError::Internal(err)
                    })?;

                match confirmed {
                    Some(entity) => {
                        let order = OrderModel::try_from(entity).map_err(OrderError::Internal)?;
                        info!(%order_id, transaction_ref, "orders: order confirmed");
                        Ok(order)
                    }
                    // Another writer won the race; re-read and settle on the
                    // idempotency rule.
                    None => {
                        let current = self.load_order(order_id).await?;
                        self.settle_confirmed(current, transaction_ref)
                    }
                }
            }
            _ => self.settle_confirmed(order, transaction_ref),
        }
    }

    pub async fn get_order(&self, order_id: Uuid) -> OrderResult<OrderModel> {
        self.load_order(order_id).await
    }

    pub async fn get_order_details(&self, order_id: Uuid) -> OrderResult<OrderDetailsModel> {
        let order = self.load_order(order_id).await?;
        let event = self
            .event_repo
            .find_by_id(order.event_id)
            .await
            .map_err(|err| {
                error!(
                    %order_id,
                    event_id = %order.event_id,
                    db_error = ?err,
                    "orders: failed to load event for order details"
                );
                OrderError::Internal(err)
            })?
            .ok_or(OrderError::EventNotFound)?;

        let attendee_count = Self::seat_count(&order.items);
        Ok(OrderDetailsModel {
            event_title: event.title,
            event_venue: event.venue,
            event_delivery_mode: DeliveryMode::from_str(&event.delivery_mode),
            event_starts_at: event.starts_at,
            attendee_count,
            order,
        })
    }

    /// Buyer abandoned checkout via the gateway cancel return. Only pending
    /// orders can be cancelled; terminal orders are left untouched.
    pub async fn cancel_order(&self, order_id: Uuid) -> OrderResult<OrderModel> {
        info!(%order_id, "orders: cancel order requested");

        let order = self.load_order(order_id).await?;
        if order.status != OrderStatus::Pending {
            let err = OrderError::Conflict(format!(
                "only pending orders can be cancelled, current status is {}",
                order.status
            ));
            warn!(
                %order_id,
                status = err.status_code().as_u16(),
                order_status = %order.status,
                "orders: cancel rejected"
            );
            return Err(err);
        }

        let cancelled = self
            .order_repo
            .cancel_pending(order_id)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "orders: conditional cancel failed");
                OrderError::Internal(err)
            })?;

        match cancelled {
            Some(entity) => {
                info!(%order_id, "orders: order cancelled");
                OrderModel::try_from(entity).map_err(OrderError::Internal)
            }
            None => self.load_order(order_id).await,
        }
    }

    async fn load_order(&self, order_id: Uuid) -> OrderResult<OrderModel> {
        let entity = self
            .order_repo
            .find_by_id(order_id)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "orders: failed to load order");
                OrderError::Internal(err)
            })?
            .ok_or_else(|| {
                let err = OrderError::OrderNotFound;
                warn!(
                    %order_id,
                    status = err.status_code().as_u16(),
                    "orders: order not found"
                );
                err
            })?;

        OrderModel::try_from(entity).map_err(OrderError::Internal)
    }

    fn settle_confirmed(&self, order: OrderModel, transaction_ref: &str) -> OrderResult<OrderModel> {
        match order.status {
            OrderStatus::Confirmed => {
                if order.transaction_ref.as_deref() == Some(transaction_ref) {
                    info!(
                        order_id = %order.id,
                        transaction_ref,
                        "orders: confirm repeated with same reference, returning existing order"
                    );
                    Ok(order)
                } else {
                    let err = OrderError::Conflict(
                        "order already confirmed with a different transaction reference"
                            .to_string(),
                    );
                    warn!(
                        order_id = %order.id,
                        transaction_ref,
                        existing_ref = ?order.transaction_ref,
                        status = err.status_code().as_u16(),
                        "orders: transaction reference mismatch on confirm"
                    );
                    Err(err)
                }
            }
            status => {
                let err =
                    OrderError::Conflict(format!("cannot confirm order in status {status}"));
                warn!(
                    order_id = %order.id,
                    order_status = %status,
                    status = err.status_code().as_u16(),
                    "orders: confirm rejected for terminal order"
                );
                Err(err)
            }
        }
    }

    fn validate_buyer(request: &CreateOrderModel) -> OrderResult<()> {
        if request.first_name.trim().is_empty() {
            return Err(Self::validation("first_name is required"));
        }
        let email = request.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(Self::validation("a valid email is required"));
        }
        if request.order_type == OrderType::FreeLocationRsvp
            && request
                .phone
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .is_empty()
        {
            return Err(Self::validation("phone is required for location RSVPs"));
        }
        Ok(())
    }

    fn validate_order_type(request: &CreateOrderModel, event: &EventEntity) -> OrderResult<()> {
        let delivery_mode = DeliveryMode::from_str(&event.delivery_mode);
        match request.order_type {
            OrderType::FreeVirtualRsvp if delivery_mode != DeliveryMode::Virtual => Err(
                Self::validation("virtual RSVP requested for an in-person event"),
            ),
            OrderType::FreeLocationRsvp if delivery_mode != DeliveryMode::InPerson => Err(
                Self::validation("location RSVP requested for a virtual event"),
            ),
            // `events.is_free` is the one authoritative free-ness flag.
            order_type if order_type.is_free() && !event.is_free => {
                Err(Self::validation("event requires a paid ticket"))
            }
            OrderType::PaidTicket if event.is_free => {
                Err(Self::validation("event is free and takes RSVPs only"))
            }
            _ => Ok(()),
        }
    }

    fn validate_items(request: &CreateOrderModel) -> OrderResult<Vec<OrderItem>> {
        for item in &request.items {
            if item.quantity == 0 {
                return Err(Self::validation("item quantity must be at least 1"));
            }
            if item.unit_price_minor < 0 {
                return Err(Self::validation("item price cannot be negative"));
            }
        }

        match request.order_type {
            OrderType::PaidTicket => {
                if request.items.is_empty() {
                    return Err(Self::validation("paid orders require at least one item"));
                }
                let total: i64 = request
                    .items
                    .iter()
                    .map(|item| item.unit_price_minor * i64::from(item.quantity))
                    .sum();
                if total <= 0 {
                    return Err(Self::validation("paid orders require a positive total"));
                }
            }
            _ => {
                let total: i64 = request
                    .items
                    .iter()
                    .map(|item| item.unit_price_minor * i64::from(item.quantity))
                    .sum();
                if total != 0 {
                    return Err(Self::validation("free RSVPs cannot carry priced items"));
                }
            }
        }

        Ok(request.items.clone())
    }

    async fn check_capacity(&self, event: &EventEntity, seats: u32) -> OrderResult<()> {
        let Some(capacity) = event.capacity else {
            return Ok(());
        };

        let taken = self
            .event_repo
            .confirmed_attendee_count(event.id)
            .await
            .map_err(|err| {
                error!(
                    event_id = %event.id,
                    db_error = ?err,
                    "orders: failed to count confirmed attendees"
                );
                OrderError::Internal(err)
            })?;

        if taken + i64::from(seats) > i64::from(capacity) {
            let err = OrderError::CapacityExceeded;
            warn!(
                event_id = %event.id,
                capacity,
                taken,
                requested = seats,
                status = err.status_code().as_u16(),
                "orders: capacity exceeded"
            );
            return Err(err);
        }
        Ok(())
    }

    /// Attendee seats in an order. A free RSVP without explicit items still
    /// reserves one seat.
    fn seat_count(items: &[OrderItem]) -> u32 {
        let seats: u32 = items.iter().map(|item| item.quantity).sum();
        seats.max(1)
    }

    fn validation(message: &str) -> OrderError {
        let err = OrderError::Validation(message.to_string());
        warn!(
            status = err.status_code().as_u16(),
            reason = message,
            "orders: validation failed"
        );
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entities::orders::OrderEntity,
        repositories::{events::MockEventRepository, orders::MockOrderRepository},
    };
    use chrono::{DateTime, Duration, Utc};

    fn sample_event(delivery_mode: &str, is_free: bool) -> EventEntity {
        EventEntity {
            id: Uuid::new_v4(),
            title: "Addis Tech Meetup".to_string(),
            description: None,
            venue: Some("Millennium Hall".to_string()),
            delivery_mode: delivery_mode.to_string(),
            capacity: None,
            is_free,
            base_price_minor: if is_free { 0 } else { 50_000 },
            currency: "ETB".to_string(),
            meeting_room: None,
            meeting_join_url: Some("https://meet.example.com/addis".to_string()),
            starts_at: Utc::now() + Duration::days(7),
            is_published: true,
            created_at: Utc::now(),
        }
    }

    fn free_rsvp_request(event_id: Uuid) -> CreateOrderModel {
        CreateOrderModel {
            event_id,
            first_name: "Abel".to_string(),
            last_name: Some("Tesfaye".to_string()),
            email: "a@x.com".to_string(),
            phone: None,
            order_type: OrderType::FreeVirtualRsvp,
            items: vec![],
        }
    }

    fn paid_request(event_id: Uuid) -> CreateOrderModel {
        CreateOrderModel {
            event_id,
            first_name: "Sara".to_string(),
            last_name: None,
            email: "sara@example.com".to_string(),
            phone: Some("+251911000000".to_string()),
            order_type: OrderType::PaidTicket,
            items: vec![OrderItem {
                ticket_id: "regular".to_string(),
                name: "Regular".to_string(),
                unit_price_minor: 50_000,
                quantity: 2,
            }],
        }
    }

    fn entity_from_insert(insert: InsertOrderEntity, created_at: DateTime<Utc>) -> OrderEntity {
        OrderEntity {
            id: insert.id,
            event_id: insert.event_id,
            first_name: insert.first_name,
            last_name: insert.last_name,
            email: insert.email,
            phone: insert.phone,
            order_type: insert.order_type,
            items: insert.items,
            total_amount_minor: insert.total_amount_minor,
            currency: insert.currency,
            status: insert.status,
            transaction_ref: insert.transaction_ref,
            created_at,
            confirmed_at: insert.confirmed_at,
        }
    }

    fn pending_paid_entity(order_id: Uuid, transaction_ref: Option<&str>) -> OrderEntity {
        OrderEntity {
            id: order_id,
            event_id: Uuid::new_v4(),
            first_name: "Sara".to_string(),
            last_name: None,
            email: "sara@example.com".to_string(),
            phone: None,
            order_type: "paid_ticket".to_string(),
            items: serde_json::json!([{
                "ticket_id": "regular",
                "name": "Regular",
                "unit_price_minor": 50_000,
                "quantity": 2
            }]),
            total_amount_minor: 100_000,
            currency: "ETB".to_string(),
            status: "pending".to_string(),
            transaction_ref: transaction_ref.map(str::to_string),
            created_at: Utc::now(),
            confirmed_at: None,
        }
    }

    fn confirmed_entity(order_id: Uuid, transaction_ref: &str) -> OrderEntity {
        let mut entity = pending_paid_entity(order_id, Some(transaction_ref));
        entity.status = "confirmed".to_string();
        entity.confirmed_at = Some(Utc::now());
        entity
    }

    #[tokio::test]
    async fn free_virtual_rsvp_confirms_synchronously() {
        let event = sample_event("virtual", true);
        let event_id = event.id;

        let mut event_repo = MockEventRepository::new();
        let mut order_repo = MockOrderRepository::new();

        event_repo
            .expect_find_by_id()
            .returning(move |_| {
                let event = event.clone();
                Box::pin(async move { Ok(Some(event)) })
            });
        order_repo.expect_insert().returning(|insert| {
            Box::pin(async move { Ok(entity_from_insert(insert, Utc::now())) })
        });

        let usecase = OrderUseCase::new(Arc::new(event_repo), Arc::new(order_repo));
        let order = usecase
            .create_order(free_rsvp_request(event_id))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.order_type, OrderType::FreeVirtualRsvp);
        assert_eq!(order.total_amount_minor, 0);
        assert!(order.confirmed_at.is_some());
    }

    #[tokio::test]
    async fn paid_order_starts_pending_with_item_total() {
        let event = sample_event("in_person", false);
        let event_id = event.id;

        let mut event_repo = MockEventRepository::new();
        let mut order_repo = MockOrderRepository::new();

        event_repo
            .expect_find_by_id()
            .returning(move |_| {
                let event = event.clone();
                Box::pin(async move { Ok(Some(event)) })
            });
        order_repo.expect_insert().returning(|insert| {
            Box::pin(async move { Ok(entity_from_insert(insert, Utc::now())) })
        });

        let usecase = OrderUseCase::new(Arc::new(event_repo), Arc::new(order_repo));
        let order = usecase.create_order(paid_request(event_id)).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount_minor, 100_000);
        assert!(order.confirmed_at.is_none());
    }

    #[tokio::test]
    async fn missing_email_is_rejected_before_any_lookup() {
        let event_repo = MockEventRepository::new();
        let order_repo = MockOrderRepository::new();

        let usecase = OrderUseCase::new(Arc::new(event_repo), Arc::new(order_repo));
        let mut request = free_rsvp_request(Uuid::new_v4());
        request.email = "  ".to_string();

        let err = usecase.create_order(request).await.unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[tokio::test]
    async fn location_rsvp_requires_phone() {
        let event_repo = MockEventRepository::new();
        let order_repo = MockOrderRepository::new();

        let usecase = OrderUseCase::new(Arc::new(event_repo), Arc::new(order_repo));
        let mut request = free_rsvp_request(Uuid::new_v4());
        request.order_type = OrderType::FreeLocationRsvp;
        request.phone = None;

        let err = usecase.create_order(request).await.unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let mut event_repo = MockEventRepository::new();
        let order_repo = MockOrderRepository::new();

        event_repo
            .expect_find_by_id()
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = OrderUseCase::new(Arc::new(event_repo), Arc::new(order_repo));
        let err = usecase
            .create_order(free_rsvp_request(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::EventNotFound));
    }

    #[tokio::test]
    async fn full_event_rejects_new_seats() {
        let mut event = sample_event("in_person", false);
        event.capacity = Some(10);
        let event_id = event.id;

        let mut event_repo = MockEventRepository::new();
        let order_repo = MockOrderRepository::new();

        event_repo
            .expect_find_by_id()
            .returning(move |_| {
                let event = event.clone();
                Box::pin(async move { Ok(Some(event)) })
            });
        event_repo
            .expect_confirmed_attendee_count()
            .returning(|_| Box::pin(async { Ok(9) }));

        let usecase = OrderUseCase::new(Arc::new(event_repo), Arc::new(order_repo));
        let err = usecase.create_order(paid_request(event_id)).await.unwrap_err();
        assert!(matches!(err, OrderError::CapacityExceeded));
    }

    #[tokio::test]
    async fn pending_order_confirms_through_conditional_update() {
        let order_id = Uuid::new_v4();

        let event_repo = MockEventRepository::new();
        let mut order_repo = MockOrderRepository::new();

        order_repo
            .expect_find_by_id()
            .returning(move |id| Box::pin(async move { Ok(Some(pending_paid_entity(id, None))) }));
        order_repo
            .expect_confirm_pending()
            .withf(|_, transaction_ref, _| transaction_ref == "tx123")
            .times(1)
            .returning(|id, transaction_ref, _| {
                let transaction_ref = transaction_ref.to_string();
                Box::pin(async move { Ok(Some(confirmed_entity(id, &transaction_ref))) })
            });

        let usecase = OrderUseCase::new(Arc::new(event_repo), Arc::new(order_repo));
        let order = usecase.confirm_order(order_id, "tx123").await.unwrap();

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.transaction_ref.as_deref(), Some("tx123"));
    }

    #[tokio::test]
    async fn duplicate_confirm_with_same_reference_is_noop() {
        let order_id = Uuid::new_v4();
        let already_confirmed = confirmed_entity(order_id, "tx123");
        let original_confirmed_at = already_confirmed.confirmed_at;

        let event_repo = MockEventRepository::new();
        let mut order_repo = MockOrderRepository::new();

        order_repo.expect_find_by_id().returning(move |_| {
            let entity = already_confirmed.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });
        // No conditional update may run for an already-confirmed order.
        order_repo.expect_confirm_pending().times(0);

        let usecase = OrderUseCase::new(Arc::new(event_repo), Arc::new(order_repo));
        let order = usecase.confirm_order(order_id, "tx123").await.unwrap();

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.confirmed_at, original_confirmed_at);
    }

    #[tokio::test]
    async fn confirm_with_mismatched_reference_is_conflict() {
        let order_id = Uuid::new_v4();
        let already_confirmed = confirmed_entity(order_id, "tx123");

        let event_repo = MockEventRepository::new();
        let mut order_repo = MockOrderRepository::new();

        order_repo.expect_find_by_id().returning(move |_| {
            let entity = already_confirmed.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });

        let usecase = OrderUseCase::new(Arc::new(event_repo), Arc::new(order_repo));
        let err = usecase.confirm_order(order_id, "tx999").await.unwrap_err();
        assert!(matches!(err, OrderError::Conflict(_)));
    }

    #[tokio::test]
    async fn lost_confirm_race_settles_idempotently() {
        let order_id = Uuid::new_v4();
        let mut sequence = 0;

        let event_repo = MockEventRepository::new();
        let mut order_repo = MockOrderRepository::new();

        // First read sees pending, the CAS loses, the re-read sees the row the
        // competing webhook confirmed with the same reference.
        order_repo.expect_find_by_id().returning(move |id| {
            sequence += 1;
            let entity = if sequence == 1 {
                pending_paid_entity(id, None)
            } else {
                confirmed_entity(id, "tx123")
            };
            Box::pin(async move { Ok(Some(entity)) })
        });
        order_repo
            .expect_confirm_pending()
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(None) }));

        let usecase = OrderUseCase::new(Arc::new(event_repo), Arc::new(order_repo));
        let order = usecase.confirm_order(order_id, "tx123").await.unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn cancelled_order_cannot_be_confirmed() {
        let order_id = Uuid::new_v4();
        let mut cancelled = pending_paid_entity(order_id, None);
        cancelled.status = "cancelled".to_string();

        let event_repo = MockEventRepository::new();
        let mut order_repo = MockOrderRepository::new();

        order_repo.expect_find_by_id().returning(move |_| {
            let entity = cancelled.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });

        let usecase = OrderUseCase::new(Arc::new(event_repo), Arc::new(order_repo));
        let err = usecase.confirm_order(order_id, "tx123").await.unwrap_err();
        assert!(matches!(err, OrderError::Conflict(_)));
    }
}
