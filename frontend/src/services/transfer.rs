//! Glue between upload tasks and the bundle list.
//!
//! An upload transport turns a blob into a stream of [`UploadEvent`]s.
//! [`stage_bundle`] records a new bundle and decides which entries get
//! uploaded; [`pump_events`] feeds one upload's events back into the
//! state until the upload reaches an outcome.

use futures::stream::LocalBoxStream;
use futures::{Stream, StreamExt};

use crate::state::BundleList;
use crate::types::{FileMeta, SlotRef, UploadError, UploadEvent, UploadableFile};

/// Events of a single upload, progress first, outcome last.
pub type UploadEvents = LocalBoxStream<'static, UploadEvent>;

/// Starts uploads of blobs of type `B`.
pub trait UploadTransport<B> {
    /// Starts uploading `blob` right away and returns its events.
    fn start(&self, blob: B, meta: &FileMeta) -> UploadEvents;
}

/// Upload to start for a freshly staged file slot.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadJob<B> {
    pub slot: SlotRef,
    pub blob: B,
    pub meta: FileMeta,
}

/// Appends a bundle for `selected` and returns the uploads to start.
///
/// Missing entries get an error slot and no job. The bundle index is
/// taken from `list` itself, so this must run against the latest state.
pub fn stage_bundle<B>(
    list: &mut BundleList,
    selected: Vec<Option<B>>,
    describe: impl Fn(&B) -> FileMeta,
) -> Vec<UploadJob<B>> {
    let mut files = Vec::with_capacity(selected.len());
    let mut ready = Vec::new();

    for (index, entry) in selected.into_iter().enumerate() {
        match entry {
            Some(blob) => {
                let meta = describe(&blob);
                files.push(UploadableFile::pending(meta.clone()));
                ready.push((index, blob, meta));
            }
            None => {
                log::warn!("Entry {} could not be read as a file", index);
                files.push(UploadableFile::unreadable());
            }
        }
    }

    let bundle = list.push_bundle(files);
    log::info!("Bundle {} added ({} uploads)", bundle, ready.len());

    ready
        .into_iter()
        .map(|(file, blob, meta)| UploadJob {
            slot: SlotRef { bundle, file },
            blob,
            meta,
        })
        .collect()
}

/// Applies every event of one upload to `slot`, stopping at the outcome.
///
/// A stream that ends without an outcome is treated as a failure, so the
/// slot never stays in flight forever. Returns the outcome.
pub async fn pump_events<S, F>(slot: SlotRef, mut events: S, mut apply: F) -> UploadEvent
where
    S: Stream<Item = UploadEvent> + Unpin,
    F: FnMut(SlotRef, &UploadEvent),
{
    while let Some(event) = events.next().await {
        apply(slot, &event);
        match &event {
            UploadEvent::Progress { .. } => continue,
            UploadEvent::Succeeded { url } => log::info!("Upload {} complete: {}", slot, url),
            UploadEvent::Failed(err) => log::error!("Upload {} failed: {}", slot, err),
        }
        return event;
    }

    log::error!("Upload {} stopped without reporting an outcome", slot);
    let event = UploadEvent::Failed(UploadError::Network("upload task ended".to_string()));
    apply(slot, &event);
    event
}

/// Replays a fixed script of events per blob name.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    scripts: std::collections::HashMap<&'static str, Vec<UploadEvent>>,
    pub(crate) started: std::cell::RefCell<Vec<&'static str>>,
}

#[cfg(test)]
impl ScriptedTransport {
    pub(crate) fn script(mut self, name: &'static str, events: Vec<UploadEvent>) -> Self {
        self.scripts.insert(name, events);
        self
    }
}

#[cfg(test)]
impl UploadTransport<&'static str> for ScriptedTransport {
    fn start(&self, blob: &'static str, _meta: &FileMeta) -> UploadEvents {
        self.started.borrow_mut().push(blob);
        let events = self.scripts.get(blob).cloned().unwrap_or_default();
        futures::stream::iter(events).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use futures::executor::block_on;
    use futures::future::join_all;
    use futures::stream;

    fn describe(name: &&'static str) -> FileMeta {
        FileMeta {
            name: name.to_string(),
            mime_type: "image/png".to_string(),
            size: 100,
        }
    }

    fn progress(bytes_uploaded: u64) -> UploadEvent {
        UploadEvent::Progress {
            bytes_uploaded,
            bytes_total: 100,
        }
    }

    fn run_all(
        transport: &ScriptedTransport,
        list: &RefCell<BundleList>,
        jobs: Vec<UploadJob<&'static str>>,
    ) -> Vec<UploadEvent> {
        let pumps = jobs.into_iter().map(|job| {
            let events = transport.start(job.blob, &job.meta);
            pump_events(job.slot, events, |slot, event| {
                list.borrow_mut().apply(slot, event);
            })
        });
        block_on(join_all(pumps))
    }

    #[test]
    fn test_unreadable_entry_is_not_uploaded() {
        let transport = ScriptedTransport::default()
            .script("a.png", vec![progress(100), UploadEvent::Succeeded { url: "https://up/a".into() }])
            .script("b.png", vec![progress(40), UploadEvent::Succeeded { url: "https://up/b".into() }]);
        let list = RefCell::new(BundleList::new());

        let jobs = stage_bundle(&mut list.borrow_mut(), vec![Some("a.png"), None, Some("b.png")], describe);
        assert_eq!(jobs.iter().map(|j| j.slot.file).collect::<Vec<_>>(), vec![0, 2]);

        run_all(&transport, &list, jobs);

        assert_eq!(*transport.started.borrow(), vec!["a.png", "b.png"]);
        let list = list.into_inner();
        let files = &list.get(0).unwrap().files;
        assert_eq!(files.len(), 3);
        assert!(files[0].complete);
        assert!(files[1].error && files[1].file.is_none() && !files[1].complete);
        assert!(files[2].complete);
        assert_eq!(files[2].url.as_deref(), Some("https://up/b"));
    }

    #[test]
    fn test_second_bundle_targets_its_own_slots() {
        let transport = ScriptedTransport::default()
            .script("a.png", vec![progress(10)])
            .script("c.png", vec![progress(60), UploadEvent::Failed(UploadError::Network("reset".into()))]);
        let list = RefCell::new(BundleList::new());

        let first = stage_bundle(&mut list.borrow_mut(), vec![Some("a.png")], describe);
        let second = stage_bundle(&mut list.borrow_mut(), vec![Some("c.png")], describe);
        assert_eq!(second[0].slot, SlotRef { bundle: 1, file: 0 });

        run_all(&transport, &list, second);
        let a_before = list.borrow().file(first[0].slot).cloned();
        assert_eq!(a_before.map(|f| f.progress), Some(0.0));

        let c = list.borrow().file(SlotRef { bundle: 1, file: 0 }).cloned().unwrap();
        assert!(c.error);
        assert_eq!(c.progress, 60.0);
    }

    #[test]
    fn test_empty_selection_still_adds_a_bundle() {
        let mut list = BundleList::new();
        list.push_bundle(vec![UploadableFile::unreadable()]);

        let jobs = stage_bundle(&mut list, Vec::<Option<&'static str>>::new(), describe);

        assert!(jobs.is_empty());
        assert_eq!(list.len(), 2);
        assert!(list.get(1).unwrap().files.is_empty());
        assert_eq!(list.get(1).unwrap().custodian, "Anonymous");
    }

    #[test]
    fn test_pump_stops_at_outcome() {
        let events = stream::iter(vec![
            progress(50),
            UploadEvent::Succeeded { url: "https://up/x".into() },
            progress(99),
        ]);
        let mut seen = Vec::new();

        let outcome = block_on(pump_events(SlotRef { bundle: 0, file: 0 }, events, |_, event| {
            seen.push(event.clone())
        }));

        assert_eq!(outcome, UploadEvent::Succeeded { url: "https://up/x".into() });
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_pump_fails_slot_when_stream_ends_early() {
        let list = RefCell::new(BundleList::new());
        let jobs = stage_bundle(&mut list.borrow_mut(), vec![Some("a.png")], describe);
        let transport = ScriptedTransport::default().script("a.png", vec![progress(30)]);

        let outcomes = run_all(&transport, &list, jobs);

        assert!(matches!(outcomes[0], UploadEvent::Failed(_)));
        let file = list.borrow().file(SlotRef { bundle: 0, file: 0 }).cloned().unwrap();
        assert!(file.error && !file.complete);
        assert_eq!(file.progress, 30.0);
    }
}
