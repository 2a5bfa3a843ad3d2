use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::orders::{InsertOrderEntity, OrderEntity};

#[async_trait]
#[automock]
pub trait OrderRepository {
    async fn insert(&self, insert_order_entity: InsertOrderEntity) -> Result<OrderEntity>;

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<OrderEntity>>;

    async fn find_by_transaction_ref(&self, transaction_ref: &str)
    -> Result<Option<OrderEntity>>;

    /// Stamps the gateway transaction reference on a still-pending order.
    async fn set_transaction_ref(&self, order_id: Uuid, transaction_ref: &str) -> Result<()>;

    /// Conditional update keyed on `status = pending`. Returns the confirmed
    /// row, or None when no pending row matched (already terminal or absent) —
    /// the serialization point for webhook/poll races.
    async fn confirm_pending(
        &self,
        order_id: Uuid,
        transaction_ref: &str,
        confirmed_at: DateTime<Utc>,
    ) -> Result<Option<OrderEntity>>;

    /// Conditional pending -> cancelled transition. Same CAS shape as
    /// `confirm_pending`.
    async fn cancel_pending(&self, order_id: Uuid) -> Result<Option<OrderEntity>>;
}
