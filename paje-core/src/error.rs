//! Error handling module for the Paje simulator core
//!
//! This module provides the error types raised while validating trace events
//! against the type hierarchy and the container tree, enabling consistent
//! error handling across the whole simulator.

pub mod container;
pub mod types;
