//! Inquiry Sentiment — classify, answer and record customer inquiries.

pub mod config;
pub mod error;
pub mod handler;
pub mod render;
pub mod routes;
pub mod sentiment;
pub mod store;
