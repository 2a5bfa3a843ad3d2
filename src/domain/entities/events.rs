use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::events;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = events)]
pub struct EventEntity {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub venue: Option<String>,
    pub delivery_mode: String,
    pub capacity: Option<i32>,
    pub is_free: bool,
    pub base_price_minor: i64,
    pub currency: String,
    pub meeting_room: Option<String>,
    pub meeting_join_url: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}
