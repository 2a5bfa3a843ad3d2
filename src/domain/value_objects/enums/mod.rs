pub mod delivery_modes;
pub mod order_statuses;
pub mod order_types;
pub mod subscription_statuses;
