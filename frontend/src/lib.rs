//! Drop Zone - Frontend Rust/Leptos Application
//!
//! A WebAssembly drop zone that groups dropped files into bundles,
//! each labelled with a custodian, and uploads every file to a
//! resumable (tus) upload endpoint with per-file progress.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  UploadPanel                                                 │
//! │  ├── hidden file picker                                      │
//! │  ├── BundleCard (custodian + files)                          │
//! │  │   └── FileRow ── ProgressIndicator                        │
//! │  └── Submit ──► on_submit(Vec<FileBundle>)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  BundleList signal  ◄── pump_events ◄── TusClient uploads    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`] - Endpoint, retry schedule and other constants
//! - [`types`] - Data model (FileBundle, UploadableFile, UploadEvent, errors)
//! - [`state`] - Copy-on-write bundle list
//! - [`components`] - UI components (UploadPanel, ProgressIndicator)
//! - [`services`] - Uploads and input handling

use leptos::*;
use leptos_router::*;
use wasm_bindgen::prelude::*;

// =============================================================================
// Module declarations
// =============================================================================

pub mod config;
pub mod types;
pub mod state;
pub mod components;
pub mod services;

// =============================================================================
// Re-exports
// =============================================================================

// Configuration
pub use config::*;

// Types
pub use types::{
    // Files
    FileMeta, UploadableFile,
    // Bundles
    FileBundle, SlotRef,
    // Uploads
    UploadEvent, progress_percent,
    // Errors
    UploadError, UploadResult,
};

// State
pub use state::{BundleList, BundleSummary};

// Components
pub use components::*;

// Services
pub use services::*;

// =============================================================================
// Application Entry Point
// =============================================================================

/// WASM entry point - called automatically by trunk.
#[wasm_bindgen(start)]
pub fn main() {
    // Setup panic hook for better error messages
    console_error_panic_hook::set_once();

    // Setup console logging
    _ = console_log::init_with_level(log::Level::Debug);

    log::info!("🦀 Drop Zone - Starting Leptos App");

    // Mount the application
    mount_to_body(|| view! { <App/> });
}

#[component]
pub fn App() -> impl IntoView {
    view! {
        <Router>
            <main>
                <Routes>
                    <Route path="/" view=MainContent/>
                </Routes>
            </main>
        </Router>
    }
}

#[component]
fn MainContent() -> impl IntoView {
    view! {
        <div class="container">
            <UploadPanel on_submit=log_submission/>
        </div>
    }
}

/// Default consumer: dumps the submitted bundles to the console.
fn log_submission(bundles: Vec<FileBundle>) {
    match serde_json::to_string_pretty(&bundles) {
        Ok(json) => log::info!("Submitted bundles:\n{}", json),
        Err(e) => log::error!("Failed to serialize submitted bundles: {}", e),
    }
}
