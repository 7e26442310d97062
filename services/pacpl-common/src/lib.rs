//! PACPL Common - Shared configuration, errors and logging for the screener.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Error types and handling utilities
//! - Logging setup with noise filtering

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, ObservabilityConfig, ProviderConfig, ScreenerConfig, ServerConfig};
pub use error::{Error, Result, ResultExt};
