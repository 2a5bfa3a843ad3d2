use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use diesel::{
    RunQueryDsl,
    prelude::*,
    sql_query,
    sql_types::{BigInt, Uuid as SqlUuid},
};
use uuid::Uuid;

use crate::{
    domain::{entities::events::EventEntity, repositories::events::EventRepository},
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::events},
};

pub struct EventPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl EventPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl EventRepository for EventPostgres {
    async fn list_published(&self) -> Result<Vec<EventEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = events::table
            .filter(events::is_published.eq(true))
            .order(events::starts_at.asc())
            .select(EventEntity::as_select())
            .load::<EventEntity>(&mut conn)?;

        Ok(results)
    }

    async fn find_by_id(&self, event_id: Uuid) -> Result<Option<EventEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = events::table
            .find(event_id)
            .select(EventEntity::as_select())
            .first::<EventEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn confirmed_attendee_count(&self, event_id: Uuid) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Seats live inside the items jsonb; an item-less RSVP still holds one
        // seat.
        let row: SeatCountRow = sql_query(
            "SELECT COALESCE(SUM(seats), 0) AS seats FROM ( \
                SELECT GREATEST(COALESCE(( \
                    SELECT SUM((item->>'quantity')::bigint) \
                    FROM jsonb_array_elements(items) AS item \
                ), 0), 1) AS seats \
                FROM orders \
                WHERE event_id = $1 AND status = 'confirmed' \
            ) AS per_order",
        )
        .bind::<SqlUuid, _>(event_id)
        .get_result(&mut conn)?;

        Ok(row.seats)
    }
}

#[derive(QueryableByName)]
struct SeatCountRow {
    #[diesel(sql_type = BigInt)]
    seats: i64,
}
