// Panel Client - Library root for testing

pub mod config;
pub mod error;
pub mod auth;
pub mod http_client;
pub mod api;
