use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One scannable entry per attendee seat. The QR payload is
/// `ticket_code|event_id|email`, derived purely from the confirmed order so
/// re-issuance is byte-identical.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketEntry {
    pub ticket_code: String,
    pub attendee_name: String,
    pub email: String,
    pub qr_payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketModel {
    pub order_id: Uuid,
    pub event_id: Uuid,
    pub event_title: String,
    pub entries: Vec<TicketEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeetingAccessModel {
    pub join_url: Option<String>,
    pub room_name: Option<String>,
    pub is_moderator: bool,
}
