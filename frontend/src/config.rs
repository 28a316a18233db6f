//! Application configuration.
//!
//! Centralized configuration for the drop zone frontend.
//! Upload settings are hardcoded here; [`TusConfig`] lets callers and
//! tests override them without touching the constants.

use std::time::Duration;

/// Resumable upload (tus) endpoint.
///
/// Public tusd demo server.
pub const TUS_ENDPOINT: &str = "https://tusd.tusdemo.net/files/";

/// Version of the tus protocol spoken by the client.
pub const TUS_VERSION: &str = "1.0.0";

/// Delays between retries of a failed upload (in milliseconds).
///
/// One retry per entry, then the upload is reported as failed.
pub const RETRY_DELAYS_MS: [u64; 5] = [0, 3000, 5000, 10000, 20000];

/// Size of a single PATCH request body (in bytes).
///
/// 5 MB. Progress is reported once per chunk.
pub const CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Custodian label given to every new bundle.
pub const DEFAULT_CUSTODIAN: &str = "Anonymous";

/// Prompt shown while no bundle exists.
pub const DROP_PROMPT: &str = "Drop your files here or click to upload them.";

/// Settings for the resumable upload client.
#[derive(Clone, Debug, PartialEq)]
pub struct TusConfig {
    /// Creation endpoint (`POST` target)
    pub endpoint: String,
    /// Retry schedule
    pub retry_delays: Vec<Duration>,
    /// Bytes per `PATCH` request
    pub chunk_size: u64,
}

impl Default for TusConfig {
    fn default() -> Self {
        Self {
            endpoint: TUS_ENDPOINT.to_string(),
            retry_delays: RETRY_DELAYS_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            chunk_size: CHUNK_SIZE,
        }
    }
}
