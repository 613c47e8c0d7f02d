//! Core domain + application logic for the exam-slot poller.
//!
//! This crate is intentionally transport-agnostic. The Trafikverket search
//! API and the Telegram bot API live behind ports (traits) implemented in
//! adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod ports;
pub mod scheduler;

pub use errors::{Error, Result};
