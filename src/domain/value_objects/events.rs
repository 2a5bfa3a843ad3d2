use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::events::EventEntity, value_objects::enums::delivery_modes::DeliveryMode,
};

/// Public catalog view of an event. Meeting credentials are deliberately
/// excluded; they are only handed out through issued meeting access.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventModel {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub venue: Option<String>,
    pub delivery_mode: DeliveryMode,
    pub capacity: Option<i32>,
    pub is_free: bool,
    pub base_price_minor: i64,
    pub currency: String,
    pub starts_at: DateTime<Utc>,
}

impl From<EventEntity> for EventModel {
    fn from(entity: EventEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            description: entity.description,
            venue: entity.venue,
            delivery_mode: DeliveryMode::from_str(&entity.delivery_mode),
            capacity: entity.capacity,
            is_free: entity.is_free,
            base_price_minor: entity.base_price_minor,
            currency: entity.currency,
            starts_at: entity.starts_at,
        }
    }
}
