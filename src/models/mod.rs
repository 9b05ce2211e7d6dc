pub mod auth;
pub mod menu;
pub mod selection;
pub mod user;
