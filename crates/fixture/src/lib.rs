//! Image Registration Fixture
//!
//! Serves a reference implementation of the image registration page so the
//! E2E suite has something to run against.

pub mod server;
pub mod static_files;

pub use server::{router, serve};
