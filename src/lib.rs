//! Mid-campaign cancellation and refund service.
//!
//! Clients ask to cancel a running submission, the service computes a
//! suggested refund from delivery progress and the category's fee rate, and
//! an administrator approves (crediting points) or rejects the request.

pub mod api;
pub mod app_state;
pub mod config;
pub mod db;
pub mod middleware;
pub mod services;
pub mod utils;
