pub mod catalog_services;
pub mod notification_services;
pub mod relay_services;
pub mod route_services;
pub mod schedule_services;
pub mod session_services;
pub mod token_services;

pub use notification_services::DynNotificationSink;
pub use relay_services::RelayServices;
pub use route_services::{RequestRouter, RouteDecision};
