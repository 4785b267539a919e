//! Partitioned in-process buffer queue with pull and push consumers

pub mod app;
pub mod core;
pub mod notifications;
pub mod push;
pub mod queue;
