pub mod auth;
pub mod health;
pub mod menu;
pub mod metrics;
pub mod selection;
pub mod users;
