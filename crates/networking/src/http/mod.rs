//! HTTP layer for the auction REST API

mod client;

pub use client::ApiClient;
