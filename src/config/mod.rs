//! Configuration module for Partify
//!
//! This module contains the server settings and path management.

mod paths;
mod server_config;

pub use paths::Paths;
pub use server_config::{ServerConfig, ServerTechnology};
