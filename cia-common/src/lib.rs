//! # Enterprise CIA Common Library
//!
//! Shared code for the Enterprise CIA services including:
//! - Database schema, models and initialization
//! - Event types (CiaEvent enum) and the EventBus
//! - Configuration loading and root folder resolution
//! - Risk score / risk level classification
//! - SSE and timestamp utilities

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod risk;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
pub use risk::{RiskLevel, RiskScore};
