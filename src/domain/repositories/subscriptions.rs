use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity};

#[async_trait]
#[automock]
pub trait SubscriptionRepository {
    async fn insert(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity>;

    /// Active, non-expired subscriptions for the user, most recent first.
    /// Correct single-writer semantics yield at most one row.
    async fn find_active_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionEntity>>;

    async fn find_by_transaction_ref(
        &self,
        transaction_ref: &str,
    ) -> Result<Option<SubscriptionEntity>>;

    /// Cancels every active subscription for the user and inserts the
    /// replacement inside one database transaction.
    async fn supersede_and_insert(
        &self,
        user_id: Uuid,
        cancel_reason: &str,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity>;

    /// Conditional pending -> active transition, stamping the billing period
    /// from activation time. Returns None when no pending row matched.
    async fn activate_pending(
        &self,
        subscription_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>>;

    /// Cancels active subscriptions, retaining them as history. Returns the
    /// number of rows cancelled.
    async fn cancel_active_for_user(&self, user_id: Uuid, cancel_reason: &str) -> Result<usize>;
}
