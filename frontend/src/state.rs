//! Bundle list state.
//!
//! [`BundleList`] is the single piece of shared mutable state of the
//! drop zone. Bundles sit behind `Rc`, and every transition clones only
//! the bundle it touches (`Rc::make_mut`). A snapshot taken with
//! [`BundleList::clone`] is therefore cheap and never observes later
//! transitions.
//!
//! Transitions are meant to run inside a signal `update`, so they always
//! act on the latest state rather than on a captured copy.

use std::rc::Rc;

use crate::types::{progress_percent, FileBundle, SlotRef, UploadEvent, UploadableFile};

/// Ordered, append-only list of bundles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BundleList {
    version: u64,
    bundles: Vec<Rc<FileBundle>>,
}

/// Per-state counters, used for logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BundleSummary {
    pub bundles: usize,
    pub files: usize,
    pub complete: usize,
    pub failed: usize,
    pub in_flight: usize,
}

impl BundleList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Incremented on every effective transition.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FileBundle> {
        self.bundles.get(index).map(Rc::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileBundle> {
        self.bundles.iter().map(Rc::as_ref)
    }

    pub fn file(&self, slot: SlotRef) -> Option<&UploadableFile> {
        self.get(slot.bundle)?.files.get(slot.file)
    }

    /// Appends a bundle with the default custodian and returns its index.
    pub fn push_bundle(&mut self, files: Vec<UploadableFile>) -> usize {
        let index = self.bundles.len();
        self.bundles.push(Rc::new(FileBundle::new(files)));
        self.version += 1;
        index
    }

    /// Overwrites the custodian of a bundle.
    ///
    /// Returns `false` (and leaves the state untouched) when the bundle
    /// does not exist or already has this custodian.
    pub fn set_custodian(&mut self, bundle: usize, custodian: &str) -> bool {
        let Some(entry) = self.bundles.get_mut(bundle) else {
            log::warn!("Custodian edit for unknown bundle {}", bundle);
            return false;
        };
        if entry.custodian == custodian {
            return false;
        }
        Rc::make_mut(entry).custodian = custodian.to_string();
        self.version += 1;
        true
    }

    /// Applies an upload event to one file slot.
    ///
    /// Events for unknown or already terminal slots are dropped, and
    /// progress never moves backwards. Returns whether the state changed.
    pub fn apply(&mut self, slot: SlotRef, event: &UploadEvent) -> bool {
        let Some(current) = self.file(slot) else {
            log::warn!("Upload event for unknown slot {}", slot);
            return false;
        };
        if current.is_terminal() {
            log::debug!("Ignoring {:?} for finished slot {}", event, slot);
            return false;
        }

        let mut next = current.clone();
        match event {
            UploadEvent::Progress { bytes_uploaded, bytes_total } => {
                let percent = progress_percent(*bytes_uploaded, *bytes_total);
                if percent <= next.progress {
                    return false;
                }
                next.progress = percent;
            }
            UploadEvent::Failed(_) => {
                next.error = true;
            }
            UploadEvent::Succeeded { url } => {
                next.complete = true;
                next.url = (!url.is_empty()).then(|| url.clone());
            }
        }

        self.replace(slot, next);
        true
    }

    /// Plain copy of every bundle, in order.
    pub fn snapshot(&self) -> Vec<FileBundle> {
        self.iter().cloned().collect()
    }

    pub fn summary(&self) -> BundleSummary {
        self.iter()
            .flat_map(|bundle| bundle.files.iter())
            .fold(
                BundleSummary {
                    bundles: self.len(),
                    ..Default::default()
                },
                |mut summary, file| {
                    summary.files += 1;
                    if file.complete {
                        summary.complete += 1;
                    } else if file.error {
                        summary.failed += 1;
                    } else {
                        summary.in_flight += 1;
                    }
                    summary
                },
            )
    }

    fn replace(&mut self, slot: SlotRef, file: UploadableFile) {
        if let Some(entry) = self.bundles.get_mut(slot.bundle) {
            if let Some(target) = Rc::make_mut(entry).files.get_mut(slot.file) {
                *target = file;
                self.version += 1;
            }
        }
    }
}
