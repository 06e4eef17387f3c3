pub mod ai;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod model;
pub mod provider;
pub mod ratelimit;
pub mod store;
pub mod validation;
