//! Common module
//!
//! This module contains shared types, errors, and utility functions used throughout the application.

pub mod error;
pub mod log;
pub mod net;
pub mod size;

// Re-export commonly used types and functions
pub use error::{ProxyError, Result};
pub use log::init_logger;
pub use net::ListenUrl;
pub use size::{capitalize, human_size, ram_in_bytes};
