//! Driver registry and content service.
//!
//! A [`ContentService`] reads a [`ServiceConfig`] of named driver tables,
//! builds drivers through a [`DriverFactory`] of tag constructors, caches
//! them by a stable hash of their parameters ([`params_key`]) and forwards
//! content operations to the selected driver.

pub mod config;
pub mod error;
pub mod hash;
pub mod registry;
pub mod service;

pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use hash::params_key;
pub use registry::{DriverConstructor, DriverFactory};
pub use service::{ContentService, DriverSelector};
