//! # Ambience Common
//!
//! Common types, utilities, and shared abstractions for Project Ambience.
//!
//! This crate provides foundational types used across all Ambience subsystems:
//! - Coordinate types (integer world positions, bounding boxes)
//! - ID types (EmitterId, SoundId, PlaybackId)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;
