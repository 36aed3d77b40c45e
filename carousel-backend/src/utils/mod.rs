//! Utilities module for the Traffic Carousel backend.
//!
//! This module provides shared helpers used by both sampling loops.

pub mod supervisor;
