//! Utility functions and helpers
//!
//! This module contains clock abstractions and atomic file helpers.

pub mod atomic;
pub mod time;

pub use atomic::{atomic_write_with, cleanup_temp_files};
pub use time::{current_millis, Clock, ManualClock, SystemClock};
