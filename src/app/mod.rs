pub mod auth;
pub mod deliveries;
pub mod menus;
pub mod mess_cut;
pub mod messes;
pub mod notifications;
pub mod subscriptions;
pub mod users;
