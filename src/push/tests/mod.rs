//! Test modules for push consumers
//!
//! Tests are organized by functional area.

mod lifetimes;
mod registration;
mod support;
