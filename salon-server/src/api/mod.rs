//! HTTP API handlers for salon-server

pub mod admin;
pub mod buildinfo;
pub mod concerts;
pub mod credentials;
pub mod error;
pub mod health;
pub mod performances;
pub mod ui;

pub use admin::{check_admin, dont_visit};
pub use buildinfo::get_build_info;
pub use concerts::{
    create_concert, delete_concert, get_concert, latest_concert, list_concerts, rebalance_concert,
    update_concert,
};
pub use error::{ApiError, ApiResult};
pub use health::health_routes;
pub use performances::{
    create_performance, delete_performance, get_performance, move_performance, update_performance,
};
pub use ui::serve_index;
