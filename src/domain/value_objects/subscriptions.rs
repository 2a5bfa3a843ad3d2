use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::{plans::PlanEntity, subscriptions::SubscriptionEntity},
    value_objects::enums::subscription_statuses::SubscriptionStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub transaction_ref: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<SubscriptionEntity> for SubscriptionModel {
    fn from(entity: SubscriptionEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            plan_id: entity.plan_id,
            status: SubscriptionStatus::from_str(&entity.status),
            starts_at: entity.starts_at,
            ends_at: entity.ends_at,
            transaction_ref: entity.transaction_ref,
            amount_minor: entity.amount_minor,
            currency: entity.currency,
            cancel_reason: entity.cancel_reason,
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanModel {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub price_minor: i64,
    pub currency: String,
    pub duration_days: i32,
    pub max_events: Option<i32>,
    pub max_attendees_per_event: Option<i32>,
}

impl From<PlanEntity> for PlanModel {
    fn from(entity: PlanEntity) -> Self {
        Self {
            id: entity.id,
            slug: entity.slug,
            name: entity.name,
            price_minor: entity.price_minor,
            currency: entity.currency,
            duration_days: entity.duration_days,
            max_events: entity.max_events,
            max_attendees_per_event: entity.max_attendees_per_event,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriptionModel {
    pub user_id: Uuid,
    pub plan_slug: String,
    #[serde(default)]
    pub force_renew: bool,
    /// Required for paid plans; the gateway checkout session is keyed on it.
    pub email: Option<String>,
    pub first_name: Option<String>,
}

/// Result of a create call: paid plans come back pending with a checkout URL,
/// trials come back active with none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateSubscriptionOutcome {
    pub subscription: SubscriptionModel,
    pub checkout_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckSubscriptionModel {
    pub user_id: Option<Uuid>,
    pub transaction_ref: Option<String>,
    #[serde(default)]
    pub bypass_cache: bool,
}

/// Cacheable status snapshot for the subscription check endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionSnapshot {
    pub status: SubscriptionStatus,
    pub plan_id: Option<Uuid>,
    pub ends_at: Option<DateTime<Utc>>,
    pub checked_at: DateTime<Utc>,
}
