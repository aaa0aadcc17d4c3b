//! Maipu MPOS support.

mod device;
mod platform;

pub use device::Mpos;
pub use platform::{FAMILY, profile, spec};
