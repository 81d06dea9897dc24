//! Core business logic for kotoba.

pub mod services;

pub use services::*;
