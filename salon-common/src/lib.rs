//! # Salon Common Library
//!
//! Shared code for the salon concert program service:
//! - Order keys and the reorder command
//! - Authorization policy and API envelope types
//! - Database models, initialization and migrations
//! - Configuration loading

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod order_key;
pub mod program;

pub use error::{Error, Result};
pub use order_key::{generate_order_key, KeyScheme, OrderKey, OrderKeyError};
pub use program::{KeyStore, MoveCommand, Program};
