//! Chorelog - household chore tracking API
//!
//! This library crate exposes the server, storage and image pipeline for
//! integration testing.

pub mod config;
pub mod images;
pub mod server;
pub mod storage;
