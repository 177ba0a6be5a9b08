//! HTTP API layer for athlo.
//!
//! This crate provides the REST API and real-time streaming:
//!
//! - **Endpoints**: profiles, posts, likes, comments, follows,
//!   notifications, tags, search, leaderboard, media upload
//! - **Extractors**: Authentication, pagination
//! - **Middleware**: Bearer-token auth, CORS, tracing
//! - **Streaming**: Server-Sent Events
//!
//! Built on Axum 0.8 with a Tower middleware stack.

// Allow dead_code for API compatibility fields in request structs
#![allow(dead_code)]

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod sse;

pub use endpoints::router;
pub use sse::{SseBroadcaster, SseEvent, SseEventPublisher};
