//! Device-family profiles.
//!
//! Prompt grammar, error signatures, mode commands and fact rules are data
//! ([`ProfileSpec`]), compiled into a [`TerminalProfile`] and looked up by
//! family and firmware version in a [`ProfileRegistry`]. Each built-in family
//! also has a concrete driver type under [`vendors`].

mod definition;
mod registry;
pub mod vendors;

pub use definition::{
    ConfigCommands, FactRules, ModeCommands, ProfileSpec, SignatureSpec, TerminalProfile,
};
pub use registry::ProfileRegistry;
