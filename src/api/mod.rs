//! Host management API
//!
//! A thin async client over the REST endpoints used to sign in and to list,
//! fetch, create and delete hosts.

mod client;
mod types;

pub use client::ApiClient;
pub use types::{AuthResponse, Host};
