//! Core entity definitions for the task list service.
//!
//! This crate defines the data types shared by the storage layer and the
//! HTTP server: the task itself and the request payloads that create or
//! modify one.

mod task;

pub use task::*;
