//! Resumable uploads over the tus 1.0 protocol.
//!
//! Each file is created on the server with a `POST`, then sent in chunks
//! with `PATCH` requests. When a request fails with a transient error the
//! upload waits according to the retry schedule, asks the server for its
//! current offset (`HEAD`) and continues from there.
//!
//! Progress is reported after every acknowledged chunk.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::StreamExt;
use gloo_net::http::{Method, Request, RequestBuilder, Response};
use gloo_timers::future::sleep;
use wasm_bindgen_futures::spawn_local;
use web_sys::File;

use crate::config::{TusConfig, TUS_VERSION};
use crate::services::transfer::{UploadEvents, UploadTransport};
use crate::types::{FileMeta, UploadError, UploadEvent, UploadResult};

/// `Content-Type` of `PATCH` bodies.
const OFFSET_CONTENT_TYPE: &str = "application/offset+octet-stream";

// =============================================================================
// Protocol helpers
// =============================================================================

/// Builds the `Upload-Metadata` header value.
///
/// Pairs are `key base64(value)`, comma separated.
pub fn encode_metadata(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{} {}", key, STANDARD.encode(value)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Metadata sent along with a file.
pub fn file_metadata(meta: &FileMeta) -> String {
    encode_metadata(&[("filename", &meta.name), ("filetype", &meta.mime_type)])
}

/// Resolves a `Location` header against the creation endpoint.
pub fn resolve_location(endpoint: &str, location: &str) -> String {
    if location.contains("://") {
        return location.to_string();
    }

    let (scheme, rest) = endpoint.split_once("://").unwrap_or(("https", endpoint));
    if let Some(host_relative) = location.strip_prefix("//") {
        return format!("{}://{}", scheme, host_relative);
    }

    let authority = rest.split('/').next().unwrap_or(rest);
    if location.starts_with('/') {
        return format!("{}://{}{}", scheme, authority, location);
    }

    let base = match endpoint.rfind('/') {
        Some(pos) if pos > scheme.len() + 2 => &endpoint[..=pos],
        _ => return format!("{}://{}/{}", scheme, authority, location),
    };
    format!("{}{}", base, location)
}

/// Whether a response status is worth another attempt.
///
/// Client errors are final, except conflicts and locks, which tus
/// servers use for offset mismatches and concurrent access.
pub fn is_retryable(status: u16) -> bool {
    !(400..500).contains(&status) || matches!(status, 409 | 423 | 429)
}

// =============================================================================
// Retry policy
// =============================================================================

/// What to do after a failed attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum RetryDecision {
    /// Wait, then resume the upload.
    Retry(Duration),
    /// Report this error.
    GiveUp(UploadError),
}

/// Tracks retries of one upload.
///
/// One retry per entry of the schedule. The counter starts over when
/// the upload made progress since the previous retry.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
    attempt: usize,
    offset_before_retry: u64,
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self {
            delays,
            attempt: 0,
            offset_before_retry: 0,
        }
    }

    /// Decides about `error`, which happened with `offset` bytes stored on
    /// the server.
    pub fn on_failure(&mut self, error: UploadError, offset: u64) -> RetryDecision {
        if !error.is_transient() {
            return RetryDecision::GiveUp(error);
        }
        if offset > self.offset_before_retry {
            self.attempt = 0;
        }

        match self.delays.get(self.attempt) {
            Some(delay) => {
                self.attempt += 1;
                self.offset_before_retry = offset;
                RetryDecision::Retry(*delay)
            }
            None => RetryDecision::GiveUp(UploadError::RetriesExhausted(Box::new(error))),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// tus client for browser `File`s.
#[derive(Clone, Debug, Default)]
pub struct TusClient {
    config: TusConfig,
}

impl TusClient {
    pub fn new(config: TusConfig) -> Self {
        Self { config }
    }
}

impl UploadTransport<File> for TusClient {
    fn start(&self, file: File, meta: &FileMeta) -> UploadEvents {
        let (events, receiver) = mpsc::unbounded();
        let upload = TusUpload {
            config: self.config.clone(),
            file,
            meta: meta.clone(),
            url: None,
            offset: 0,
        };

        log::info!("📤 Starting upload of {} ({} bytes)", meta.name, meta.size);
        spawn_local(upload.run(events));
        receiver.boxed_local()
    }
}

/// One file being uploaded.
struct TusUpload {
    config: TusConfig,
    file: File,
    meta: FileMeta,
    /// Upload resource, once created
    url: Option<String>,
    /// Bytes stored on the server
    offset: u64,
}

impl TusUpload {
    async fn run(mut self, events: UnboundedSender<UploadEvent>) {
        let mut retries = RetryPolicy::new(self.config.retry_delays.clone());

        let outcome = loop {
            let error = match self.attempt(&events).await {
                Ok(url) => break UploadEvent::Succeeded { url },
                Err(err) => err,
            };

            match retries.on_failure(error, self.offset) {
                RetryDecision::Retry(delay) => {
                    log::warn!(
                        "Upload of {} interrupted at {} bytes, retrying in {:?}",
                        self.meta.name,
                        self.offset,
                        delay
                    );
                    sleep(delay).await;
                }
                RetryDecision::GiveUp(err) => break UploadEvent::Failed(err),
            }
        };

        // The receiver is gone when nobody listens anymore.
        let _ = events.unbounded_send(outcome);
    }

    /// Creates or resumes the upload, then sends the remaining chunks.
    async fn attempt(&mut self, events: &UnboundedSender<UploadEvent>) -> UploadResult<String> {
        let url = self.resume_or_create().await?;
        let total = self.meta.size;

        while self.offset < total {
            let end = (self.offset + self.config.chunk_size.max(1)).min(total);
            let acknowledged = self.patch(&url, end).await?;
            if acknowledged <= self.offset || acknowledged > total {
                return Err(UploadError::Protocol(format!(
                    "server acknowledged offset {} after sending up to {}",
                    acknowledged, end
                )));
            }
            self.offset = acknowledged;
            log::debug!("{}: {}/{} bytes", self.meta.name, self.offset, total);
            let _ = events.unbounded_send(UploadEvent::Progress {
                bytes_uploaded: self.offset,
                bytes_total: total,
            });
        }

        Ok(url)
    }

    async fn resume_or_create(&mut self) -> UploadResult<String> {
        if let Some(url) = self.url.clone() {
            match self.head(&url).await {
                Ok(offset) => {
                    self.offset = offset;
                    return Ok(url);
                }
                // Expired or unknown upload: start over.
                Err(UploadError::Status { code: 404 | 410, .. }) => {
                    log::warn!("Upload {} is gone on the server, creating a new one", url);
                    self.url = None;
                }
                Err(err) => return Err(err),
            }
        }

        let url = self.create().await?;
        self.url = Some(url.clone());
        self.offset = 0;
        Ok(url)
    }

    async fn create(&self) -> UploadResult<String> {
        let response = send(
            Request::post(&self.config.endpoint)
                .header("Tus-Resumable", TUS_VERSION)
                .header("Upload-Length", &self.meta.size.to_string())
                .header("Upload-Metadata", &file_metadata(&self.meta)),
        )
        .await?;
        expect_status(&response, 201).await?;

        let location = response
            .headers()
            .get("Location")
            .ok_or_else(|| UploadError::Protocol("missing Location header".to_string()))?;
        let url = resolve_location(&self.config.endpoint, &location);
        log::info!("Created upload {} for {}", url, self.meta.name);
        Ok(url)
    }

    async fn head(&self, url: &str) -> UploadResult<u64> {
        let response = send(
            RequestBuilder::new(url)
                .method(Method::HEAD)
                .header("Tus-Resumable", TUS_VERSION),
        )
        .await?;
        expect_status(&response, 200).await?;
        upload_offset(&response)
    }

    async fn patch(&self, url: &str, end: u64) -> UploadResult<u64> {
        let chunk = self
            .file
            .slice_with_f64_and_f64(self.offset as f64, end as f64)
            .map_err(|_| UploadError::Unreadable)?;

        let request = Request::patch(url)
            .header("Tus-Resumable", TUS_VERSION)
            .header("Upload-Offset", &self.offset.to_string())
            .header("Content-Type", OFFSET_CONTENT_TYPE)
            .body(chunk)
            .map_err(|e| UploadError::Network(e.to_string()))?;
        let response = request
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;
        expect_status(&response, 204).await?;
        upload_offset(&response)
    }
}

async fn send(request: RequestBuilder) -> UploadResult<Response> {
    request
        .send()
        .await
        .map_err(|e| UploadError::Network(e.to_string()))
}

async fn expect_status(response: &Response, expected: u16) -> UploadResult<()> {
    let code = response.status();
    if code == expected || (expected == 200 && response.ok()) {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(UploadError::Status { code, body })
}

fn upload_offset(response: &Response) -> UploadResult<u64> {
    response
        .headers()
        .get("Upload-Offset")
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| UploadError::Protocol("missing or invalid Upload-Offset".to_string()))
}
