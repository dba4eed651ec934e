//! Tests for the step engine
//!
//! Organized by component

mod helpers;
