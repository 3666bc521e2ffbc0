//! Database access layer for salon-server
//!
//! Concert and performance queries over the shared pool. Performances are
//! never ordered by SQL; every list goes through [`sort_program`] so keys of
//! different schemes compare by value.
//!
//! [`sort_program`]: salon_common::db::sort_program

pub mod concerts;
pub mod key_store;
pub mod performances;

pub use concerts::{
    create_concert, delete_concert, get_concert, latest_concert, list_concerts, rebalance_concert,
    update_concert,
};
pub use key_store::SqliteKeyStore;
pub use performances::{
    create_performance, delete_performance, get_performance, list_performances, set_order_key,
    update_performance,
};
