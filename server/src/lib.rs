//! Disaster server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod broadcast;
pub mod clock;
pub mod config;
pub mod gateway;
pub mod http;
pub mod seed;
pub mod session;
pub mod world;
pub mod ws;
