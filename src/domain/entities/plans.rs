use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::plans;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plans)]
pub struct PlanEntity {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub price_minor: i64,
    pub currency: String,
    pub duration_days: i32,
    pub max_events: Option<i32>,
    pub max_attendees_per_event: Option<i32>,
    pub is_active: bool,
}
