use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::events::EventEntity;

#[async_trait]
#[automock]
pub trait EventRepository {
    async fn list_published(&self) -> Result<Vec<EventEntity>>;
    async fn find_by_id(&self, event_id: Uuid) -> Result<Option<EventEntity>>;
    /// Attendee seats across all confirmed orders for the event, for capacity
    /// checks.
    async fn confirmed_attendee_count(&self, event_id: Uuid) -> Result<i64>;
}
