//! Core copy module
//!
//! Provides the directory copier and the convenience entry points
//! that run it against the host filesystem.

mod copier;

pub use copier::*;
