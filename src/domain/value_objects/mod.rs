pub mod enums;
pub mod events;
pub mod orders;
pub mod subscriptions;
pub mod tickets;
