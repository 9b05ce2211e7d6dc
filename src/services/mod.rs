pub mod auth;
pub mod daily_summary;
pub mod date_window;
pub mod eligibility;
pub mod menu;
pub mod menu_scheduler;
pub mod metrics;
pub mod selection;
pub mod slack;
