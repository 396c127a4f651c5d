//! Authentication edge filter for an API gateway.
//!
//! Every inbound request is classified by path, its bearer credential is
//! validated (unless exempt), exchanged for a short-lived passport, and the
//! passport claims are attached as `X-PP-*` headers before the request is
//! handed to the routing fabric.

pub mod app;
pub mod config;
pub mod error;
pub mod fabric;
pub mod middleware;
pub mod services;
pub mod state;
