pub mod app;
pub mod auth_handlers;
pub mod cart_handlers;
pub mod config;
pub mod extract;
pub mod gateway;
pub mod guards;
pub mod menu_handlers;
pub mod metrics;
pub mod models;
pub mod payment_handlers;
pub mod review_handlers;
pub mod stats_handlers;
pub mod store;
pub mod user_handlers;

pub use app::{build_router, AppState, HttpOptions};
pub use config::{ServiceConfig, StoreBackend};
