pub mod client;
pub mod models;

pub use client::{AuthResponse, BackendClient, BalanceSource, LiveFeed, MatchQuery, RegisterRequest};
