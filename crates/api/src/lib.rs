//! HTTP API: configuration, server wiring, routing, and request/response
//! mapping.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;
