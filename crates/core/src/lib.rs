//! Core business logic for athlo.

pub mod services;

pub use services::*;
