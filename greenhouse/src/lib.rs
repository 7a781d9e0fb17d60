//! Greenhouse controller.
//!
//! Polls temperature, humidity, ambient light and soil moisture on aligned
//! ticks, stores every reading, takes photos, and waters the plant when the
//! soil is dry or it hasn't been watered for too long.

pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod poller;
pub mod pump;
pub mod record;
pub mod scheduler;
pub mod sensors;

pub use error::{Error, Result};
