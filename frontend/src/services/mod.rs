//! Upload and input services.
//!
//! This module provides everything the drop zone delegates:
//!
//! # Services
//!
//! - [`tus`] - Resumable uploads (tus 1.0) to the upload endpoint
//! - [`transfer`] - Upload transport seam and the event pump feeding state
//! - [`selection`] - Files out of drop payloads and the file picker

pub mod tus;
pub mod transfer;
pub mod selection;

pub use tus::*;
pub use transfer::*;
pub use selection::*;
