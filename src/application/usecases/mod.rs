pub mod orders;
pub mod payments;
pub mod subscriptions;
pub mod tickets;
