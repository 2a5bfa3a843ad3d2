use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use uuid::Uuid;

use crate::{
    domain::{
        entities::orders::{InsertOrderEntity, OrderEntity},
        repositories::orders::OrderRepository,
        value_objects::enums::order_statuses::OrderStatus,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::orders},
};

pub struct OrderPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl OrderPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl OrderRepository for OrderPostgres {
    async fn insert(&self, insert_order_entity: InsertOrderEntity) -> Result<OrderEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(orders::table)
            .values(&insert_order_entity)
            .returning(OrderEntity::as_returning())
            .get_result::<OrderEntity>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = orders::table
            .find(order_id)
            .select(OrderEntity::as_select())
            .first::<OrderEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_transaction_ref(
        &self,
        transaction_ref: &str,
    ) -> Result<Option<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = orders::table
            .filter(orders::transaction_ref.eq(transaction_ref))
            .select(OrderEntity::as_select())
            .first::<OrderEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn set_transaction_ref(&self, order_id: Uuid, transaction_ref: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(orders::table)
            .filter(orders::id.eq(order_id))
            .filter(orders::status.eq(OrderStatus::Pending.to_string()))
            .set(orders::transaction_ref.eq(transaction_ref))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn confirm_pending(
        &self,
        order_id: Uuid,
        transaction_ref: &str,
        confirmed_at: DateTime<Utc>,
    ) -> Result<Option<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Conditional on status so concurrent confirmations serialize to one
        // winner; losers get None and re-read.
        let result = update(orders::table)
            .filter(orders::id.eq(order_id))
            .filter(orders::status.eq(OrderStatus::Pending.to_string()))
            .set((
                orders::status.eq(OrderStatus::Confirmed.to_string()),
                orders::transaction_ref.eq(Some(transaction_ref)),
                orders::confirmed_at.eq(Some(confirmed_at)),
            ))
            .returning(OrderEntity::as_returning())
            .get_result::<OrderEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn cancel_pending(&self, order_id: Uuid) -> Result<Option<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(orders::table)
            .filter(orders::id.eq(order_id))
            .filter(orders::status.eq(OrderStatus::Pending.to_string()))
            .set(orders::status.eq(OrderStatus::Cancelled.to_string()))
            .returning(OrderEntity::as_returning())
            .get_result::<OrderEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }
}
