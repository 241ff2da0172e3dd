//! Ordering guarantees at wait points
