//! Clima Proxy Library
//!
//! A caching HTTP proxy in front of WeatherAPI.com for the weather dashboard.
//! The binary wires these modules together; integration tests drive them directly.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod handler;
pub mod resolver;
pub mod server;
