//! Configuration module for TreeCopy
//!
//! Provides CLI arguments and the runtime options of a copy.

mod settings;

pub use settings::*;
