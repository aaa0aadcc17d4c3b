//! Built-in device families.

pub mod mpos;
