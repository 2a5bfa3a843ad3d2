use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    FreeVirtualRsvp,
    FreeLocationRsvp,
    PaidTicket,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::FreeVirtualRsvp => "free_virtual_rsvp",
            OrderType::FreeLocationRsvp => "free_location_rsvp",
            OrderType::PaidTicket => "paid_ticket",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "free_virtual_rsvp" => Some(OrderType::FreeVirtualRsvp),
            "free_location_rsvp" => Some(OrderType::FreeLocationRsvp),
            "paid_ticket" => Some(OrderType::PaidTicket),
            _ => None,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, OrderType::FreeVirtualRsvp | OrderType::FreeLocationRsvp)
    }
}

impl Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
