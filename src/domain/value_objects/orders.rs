use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::orders::OrderEntity,
    value_objects::enums::{
        delivery_modes::DeliveryMode, order_statuses::OrderStatus, order_types::OrderType,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub ticket_id: String,
    pub name: String,
    pub unit_price_minor: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuyerDetails {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderModel {
    pub event_id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub order_type: OrderType,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderModel {
    pub id: Uuid,
    pub event_id: Uuid,
    pub buyer: BuyerDetails,
    pub order_type: OrderType,
    pub items: Vec<OrderItem>,
    pub total_amount_minor: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub transaction_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderEntity> for OrderModel {
    type Error = anyhow::Error;

    fn try_from(entity: OrderEntity) -> Result<Self, Self::Error> {
        let order_type = OrderType::from_str(&entity.order_type)
            .ok_or_else(|| anyhow::anyhow!("unknown order type: {}", entity.order_type))?;
        let items: Vec<OrderItem> = serde_json::from_value(entity.items)?;

        Ok(Self {
            id: entity.id,
            event_id: entity.event_id,
            buyer: BuyerDetails {
                first_name: entity.first_name,
                last_name: entity.last_name,
                email: entity.email,
                phone: entity.phone,
            },
            order_type,
            items,
            total_amount_minor: entity.total_amount_minor,
            currency: entity.currency,
            status: OrderStatus::from_str(&entity.status),
            transaction_ref: entity.transaction_ref,
            created_at: entity.created_at,
            confirmed_at: entity.confirmed_at,
        })
    }
}

/// Order plus display fields derived from the event, for confirmation pages
/// that only hold an opaque order id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderDetailsModel {
    #[serde(flatten)]
    pub order: OrderModel,
    pub event_title: String,
    pub event_venue: Option<String>,
    pub event_delivery_mode: DeliveryMode,
    pub event_starts_at: DateTime<Utc>,
    pub attendee_count: u32,
}
