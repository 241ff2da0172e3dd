//! Failure detection and reporting

pub mod timeouts;
