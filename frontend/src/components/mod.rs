//! UI Components for the drop zone application.
//!
//! - [`UploadPanel`] - Drop zone: bundles, custodians, uploads, submit
//! - `BundleCard` / `FileRow` - One bundle and one of its files
//! - [`ProgressIndicator`] - Percentage bar with a numeric label

mod upload;
mod progress;

pub use upload::*;
pub use progress::*;
