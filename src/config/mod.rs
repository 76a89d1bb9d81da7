//! Settings file parsing and defaults

pub mod settings;

pub use settings::*;
