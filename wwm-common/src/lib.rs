//! # WWM Common Library
//!
//! Shared code for the waste-classification monitoring dashboard:
//! - Domain model (classification records, aggregate stats, device status)
//! - Backend wire types and their validated conversion
//! - Notification events (DashboardEvent enum) and EventBus
//! - Configuration loading
//! - Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod time;

pub use error::{Error, Result};
