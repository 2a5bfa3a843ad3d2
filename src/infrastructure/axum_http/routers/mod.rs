pub mod events;
pub mod orders;
pub mod payments;
pub mod subscriptions;
