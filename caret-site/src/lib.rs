//! Caret site library
//!
//! This library provides the marketing site, the admin panel and the backend
//! client behind them. The binary entry point is in main.rs.

pub mod admin;
pub mod backend;
pub mod config;
pub mod models;
pub mod render;
pub mod server;
pub mod site;
