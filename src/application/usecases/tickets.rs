use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    repositories::{events::EventRepository, orders::OrderRepository},
    value_objects::{
        enums::{delivery_modes::DeliveryMode, order_statuses::OrderStatus},
        orders::OrderModel,
        tickets::{MeetingAccessModel, TicketEntry, TicketModel},
    },
};

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("order not found")]
    OrderNotFound,
    #[error("event not found")]
    EventNotFound,
    #[error("order is not confirmed")]
    OrderNotConfirmed,
    #[error("meeting access is only available for virtual events")]
    NotAVirtualEvent,
    #[error("event has no meeting configuration")]
    MissingMeetingConfiguration,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl TicketError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            TicketError::OrderNotFound | TicketError::EventNotFound => StatusCode::NOT_FOUND,
            TicketError::OrderNotConfirmed => StatusCode::CONFLICT,
            TicketError::NotAVirtualEvent => StatusCode::BAD_REQUEST,
            TicketError::MissingMeetingConfiguration => StatusCode::UNPROCESSABLE_ENTITY,
            TicketError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type TicketResult<T> = std::result::Result<T, TicketError>;

/// Derives tickets and meeting credentials from confirmed orders. Everything
/// here is a pure function of the order and event rows, so re-issuance always
/// reproduces the same artifact.
pub struct TicketUseCase<E, O>
where
    E: EventRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
{
    event_repo: Arc<E>,
    order_repo: Arc<O>,
}

impl<E, O> TicketUseCase<E, O>
where
    E: EventRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
{
    pub fn new(event_repo: Arc<E>, order_repo: Arc<O>) -> Self {
        Self {
            event_repo,
            order_repo,
        }
    }

    pub async fn issue_ticket(&self, order_id: Uuid) -> TicketResult<TicketModel> {
        let order = self.load_confirmed_order(order_id).await?;
        let event = self.load_event(order.event_id).await?;

        let entries = Self::expand_entries(&order);
        info!(
            %order_id,
            event_id = %order.event_id,
            entry_count = entries.len(),
            "tickets: ticket issued"
        );

        Ok(TicketModel {
            order_id: order.id,
            event_id: order.event_id,
            event_title: event.title,
            entries,
        })
    }

    pub async fn issue_meeting_access(
        &self,
        order_id: Uuid,
    ) -> TicketResult<MeetingAccessModel> {
        let order = self.load_confirmed_order(order_id).await?;
        let event = self.load_event(order.event_id).await?;

        if DeliveryMode::from_str(&event.delivery_mode) != DeliveryMode::Virtual {
            let err = TicketError::NotAVirtualEvent;
            warn!(
                %order_id,
                event_id = %event.id,
                status = err.status_code().as_u16(),
                "tickets: meeting access requested for in-person event"
            );
            return Err(err);
        }

        if event.meeting_join_url.is_none() && event.meeting_room.is_none() {
            let err = TicketError::MissingMeetingConfiguration;
            warn!(
                %order_id,
                event_id = %event.id,
                status = err.status_code().as_u16(),
                "tickets: event lacks meeting configuration"
            );
            return Err(err);
        }

        info!(%order_id, event_id = %event.id, "tickets: meeting access issued");
        Ok(MeetingAccessModel {
            join_url: event.meeting_join_url,
            room_name: event.meeting_room,
            is_moderator: false,
        })
    }

    /// One entry per seat; the ticket code and QR payload depend only on the
    /// order row, never on issuance time.
    fn expand_entries(order: &OrderModel) -> Vec<TicketEntry> {
        let attendee_name = match &order.buyer.last_name {
            Some(last_name) => format!("{} {}", order.buyer.first_name, last_name),
            None => order.buyer.first_name.clone(),
        };

        if order.items.is_empty() {
            // Free RSVP without explicit items still admits one attendee.
            let ticket_code = format!("{}-rsvp-1", order.id.simple());
            return vec![TicketEntry {
                qr_payload: Self::qr_payload(&ticket_code, order),
                ticket_code,
                attendee_name,
                email: order.buyer.email.clone(),
            }];
        }

        order
            .items
            .iter()
            .flat_map(|item| {
                let order_id = order.id;
                (1..=item.quantity).map(move |seat| {
                    format!("{}-{}-{}", order_id.simple(), item.ticket_id, seat)
                })
            })
            .map(|ticket_code| TicketEntry {
                qr_payload: Self::qr_payload(&ticket_code, order),
                ticket_code,
                attendee_name: attendee_name.clone(),
                email: order.buyer.email.clone(),
            })
            .collect()
    }

    fn qr_payload(ticket_code: &str, order: &OrderModel) -> String {
        format!("{}|{}|{}", ticket_code, order.event_id, order.buyer.email)
    }

    async fn load_confirmed_order(&self, order_id: Uuid) -> TicketResult<OrderModel> {
        let entity = self
            .order_repo
            .find_by_id(order_id)
            .await
            .map_err(TicketError::Internal)?
            .ok_or(TicketError::OrderNotFound)?;
        let order = OrderModel::try_from(entity).map_err(TicketError::Internal)?;

        if order.status != OrderStatus::Confirmed {
            let err = TicketError::OrderNotConfirmed;
            warn!(
                %order_id,
                order_status = %order.status,
                status = err.status_code().as_u16(),
                "tickets: issuance rejected for unconfirmed order"
            );
            return Err(err);
        }
        Ok(order)
    }

    async fn load_event(
        &self,
        event_id: Uuid,
    ) -> TicketResult<crate::domain::entities::events::EventEntity> {
        self.event_repo
            .find_by_id(event_id)
            .await
            .map_err(TicketError::Internal)?
            .ok_or(TicketError::EventNotFound)
    }
}
