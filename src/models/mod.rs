//! Response models for the demo server API
//!
//! JSON bodies returned by the clock, health, stats and admin endpoints.

pub mod responses;

pub use responses::{
    ClockResponse, ErrorResponse, HealthResponse, InvalidateResponse, StatsResponse,
};
