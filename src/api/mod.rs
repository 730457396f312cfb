//! HTTP API for UI layers
//!
//! Run with `labcalc-server`.

pub mod handlers;
pub mod server;

pub use server::{build_router, run_api_server};
