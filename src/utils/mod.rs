//! Utility modules for Partify

pub mod auth;
pub mod dates;
