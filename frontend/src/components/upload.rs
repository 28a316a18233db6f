//! Drop zone with file bundles and resumable uploads.
//!
//! Every drop or picker selection becomes a bundle. Its files start
//! uploading immediately; progress flows back into the shared
//! [`BundleList`] signal. Submit hands the current bundles to the caller.

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use leptos::*;
use web_sys::{DragEvent, Event, File, HtmlInputElement, MouseEvent};

use crate::services::{
    files_from_list, pump_events, stage_bundle, DragPayload, TusClient, UploadTransport,
};
use crate::state::BundleList;
use crate::types::{FileBundle, FileMeta, SlotRef, UploadEvent};
use crate::{ProgressIndicator, TusConfig, DROP_PROMPT};

#[component]
pub fn UploadPanel(
    /// Receives the bundle list when the user presses Submit
    #[prop(into)]
    on_submit: Callback<Vec<FileBundle>>,
    /// Upload settings, defaults to the configured endpoint
    #[prop(optional)]
    config: Option<TusConfig>,
) -> impl IntoView {
    let (bundles, set_bundles) = create_signal(BundleList::new());
    let (hover, set_hover) = create_signal(DragHover::default());
    let file_input = create_node_ref::<html::Input>();
    let client = TusClient::new(config.unwrap_or_default());

    let on_drop = {
        let client = client.clone();
        move |ev: DragEvent| {
            ev.prevent_default();
            ev.stop_propagation();
            set_hover.update(DragHover::reset);

            if let Some(data) = ev.data_transfer() {
                let selected = DragPayload::from_data_transfer(&data).into_files();
                spawn_uploads(add_files(set_bundles, &client, selected, describe_file));
            }
        }
    };

    let on_file_change = move |ev: Event| {
        let input: HtmlInputElement = event_target(&ev);
        let selected = input
            .files()
            .map(|list| files_from_list(&list))
            .unwrap_or_default();
        // Picking the same file again must fire `change` again.
        input.set_value("");
        spawn_uploads(add_files(set_bundles, &client, selected, describe_file));
    };

    // Clicking anywhere on the zone opens the picker
    let open_picker = move |_: MouseEvent| {
        if let Some(input) = file_input.get() {
            input.click();
        }
    };

    let on_submit_click = move |ev: MouseEvent| {
        ev.stop_propagation();
        submit(bundles, on_submit);
    };

    view! {
        <div
            class="dropzone"
            class:hovering=move || hover.with(DragHover::is_hovering)
            on:dragover=|ev: DragEvent| ev.prevent_default()
            on:dragenter=move |_| set_hover.update(DragHover::enter)
            on:dragleave=move |_| set_hover.update(DragHover::leave)
            on:drop=on_drop
            on:click=open_picker
        >
            <input
                type="file"
                multiple=true
                tabindex="-1"
                class="hidden-input"
                style="display:none"
                node_ref=file_input
                on:click=|ev: MouseEvent| ev.stop_propagation()
                on:change=on_file_change
            />

            <Show
                when=move || !bundles.with(BundleList::is_empty)
                fallback=|| view! { <p class="drop-prompt">{DROP_PROMPT}</p> }
            >
                <div class="dropzone-bundles">
                    <For
                        each=move || 0..bundles.with(BundleList::len)
                        key=|index| *index
                        children=move |index| view! {
                            <BundleCard index=index bundles=bundles set_bundles=set_bundles/>
                        }
                    />
                </div>
                <div class="dropzone-submit">
                    <button on:click=on_submit_click>"Submit"</button>
                </div>
            </Show>
        </div>
    }
}

/// Tracks drag enter/leave pairs over the zone.
///
/// Moving over a child element fires `dragenter` on the child before
/// `dragleave` on the parent, so the zone is hovered while the depth is
/// positive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DragHover {
    depth: u32,
}

impl DragHover {
    pub fn enter(&mut self) {
        self.depth += 1;
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn reset(&mut self) {
        self.depth = 0;
    }

    pub fn is_hovering(&self) -> bool {
        self.depth > 0
    }
}

/// Upload pumps of one selection, resolving to each upload's outcome.
type UploadPumps = Vec<LocalBoxFuture<'static, UploadEvent>>;

fn describe_file(file: &File) -> FileMeta {
    FileMeta::from(file)
}

/// Stages a bundle for `selected` and starts its uploads.
///
/// Every interaction adds a bundle, even one without files. The returned
/// pumps feed upload events into `set_bundles` once polled.
fn add_files<B, T>(
    set_bundles: WriteSignal<BundleList>,
    transport: &T,
    selected: Vec<Option<B>>,
    describe: impl Fn(&B) -> FileMeta,
) -> UploadPumps
where
    T: UploadTransport<B>,
{
    let Some(jobs) = set_bundles.try_update(|list| stage_bundle(list, selected, describe)) else {
        log::warn!("Drop zone is gone, selection ignored");
        return Vec::new();
    };

    jobs.into_iter()
        .map(|job| {
            let events = transport.start(job.blob, &job.meta);
            pump_events(job.slot, events, move |slot, event| {
                set_bundles.update(|list| {
                    list.apply(slot, event);
                });
            })
            .boxed_local()
        })
        .collect()
}

fn spawn_uploads(pumps: UploadPumps) {
    for pump in pumps {
        spawn_local(async move {
            pump.await;
        });
    }
}

/// Hands the current bundles to the consumer, uploads in flight included.
fn submit(bundles: ReadSignal<BundleList>, on_submit: Callback<Vec<FileBundle>>) {
    let current = bundles.get_untracked();
    let summary = current.summary();
    log::info!(
        "📨 Submitting {} bundles ({} files: {} complete, {} failed, {} uploading)",
        summary.bundles,
        summary.files,
        summary.complete,
        summary.failed,
        summary.in_flight
    );
    on_submit.call(current.snapshot());
}

#[component]
fn BundleCard(
    index: usize,
    bundles: ReadSignal<BundleList>,
    set_bundles: WriteSignal<BundleList>,
) -> impl IntoView {
    let custodian = move || {
        bundles.with(|list| {
            list.get(index)
                .map(|bundle| bundle.custodian.clone())
                .unwrap_or_default()
        })
    };
    let file_count = bundles.with_untracked(|list| list.get(index).map_or(0, |b| b.files.len()));

    view! {
        <div class="dropzone-bundle">
            <label>"Custodian: "</label>
            <input
                type="text"
                prop:value=custodian
                on:click=|ev: MouseEvent| ev.stop_propagation()
                on:input=move |ev| {
                    let value = event_target_value(&ev);
                    set_bundles.update(|list| {
                        list.set_custodian(index, &value);
                    });
                }
            />
            <div class="dropzone-files">
                {(0..file_count)
                    .map(|file| {
                        let at = SlotRef { bundle: index, file };
                        view! { <FileRow at=at bundles=bundles/> }
                    })
                    .collect_view()}
            </div>
        </div>
    }
}

#[component]
fn FileRow(at: SlotRef, bundles: ReadSignal<BundleList>) -> impl IntoView {
    let name = bundles.with_untracked(|list| {
        list.file(at)
            .map(|file| file.name().to_string())
            .unwrap_or_default()
    });
    let progress = Signal::derive(move || {
        bundles.with(|list| list.file(at).map_or(0.0, |file| file.progress))
    });
    let failed = move || bundles.with(|list| list.file(at).is_some_and(|file| file.error));
    let complete = move || bundles.with(|list| list.file(at).is_some_and(|file| file.complete));
    let url = move || bundles.with(|list| list.file(at).and_then(|file| file.url.clone()));

    view! {
        <div class="dropzone-file" class:error=failed class:complete=complete>
            <span class="dropzone-file-name">{name}</span>
            <ProgressIndicator percentage=progress/>
            {move || url().map(|href| view! {
                <a
                    class="dropzone-file-link"
                    href=href
                    target="_blank"
                    on:click=|ev: MouseEvent| ev.stop_propagation()
                >
                    "Open"
                </a>
            })}
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use futures::executor::block_on;
    use futures::future::join_all;

    use crate::services::transfer::ScriptedTransport;
    use crate::types::{UploadError, UploadableFile};

    fn describe(name: &&'static str) -> FileMeta {
        FileMeta {
            name: name.to_string(),
            mime_type: "text/plain".to_string(),
            size: 200,
        }
    }

    fn progress(bytes_uploaded: u64) -> UploadEvent {
        UploadEvent::Progress {
            bytes_uploaded,
            bytes_total: 200,
        }
    }

    #[test]
    fn test_add_files_feeds_uploads_into_state() {
        let runtime = create_runtime();
        let (bundles, set_bundles) = create_signal(BundleList::new());
        let transport = ScriptedTransport::default()
            .script("a.txt", vec![progress(100), UploadEvent::Succeeded { url: "https://up/a".into() }])
            .script("c.txt", vec![progress(50), UploadEvent::Failed(UploadError::Network("reset".into()))]);

        let pumps = add_files(set_bundles, &transport, vec![Some("a.txt"), None, Some("c.txt")], describe);

        assert_eq!(pumps.len(), 2);
        assert_eq!(*transport.started.borrow(), vec!["a.txt", "c.txt"]);
        assert_eq!(bundles.with_untracked(|list| list.len()), 1);

        block_on(join_all(pumps));

        bundles.with_untracked(|list| {
            let files = &list.get(0).unwrap().files;
            assert_eq!(files.len(), 3);
            assert!(files[0].complete && files[0].progress == 50.0);
            assert_eq!(files[0].url.as_deref(), Some("https://up/a"));
            assert!(files[1].error && files[1].file.is_none());
            assert!(files[2].error && !files[2].complete);
            assert_eq!(files[2].progress, 25.0);
        });
        runtime.dispose();
    }

    #[test]
    fn test_empty_selection_adds_an_empty_bundle() {
        let runtime = create_runtime();
        let (bundles, set_bundles) = create_signal(BundleList::new());
        let transport = ScriptedTransport::default();

        let pumps = add_files(set_bundles, &transport, Vec::<Option<&'static str>>::new(), describe);

        assert!(pumps.is_empty());
        bundles.with_untracked(|list| {
            assert_eq!(list.len(), 1);
            assert!(list.get(0).unwrap().files.is_empty());
        });
        runtime.dispose();
    }

    #[test]
    fn test_submit_calls_consumer_once_with_current_bundles() {
        let runtime = create_runtime();
        let (bundles, set_bundles) = create_signal(BundleList::new());
        let received = Rc::new(RefCell::new(Vec::new()));
        let on_submit = Callback::new({
            let received = received.clone();
            move |submitted: Vec<FileBundle>| received.borrow_mut().push(submitted)
        });

        set_bundles.update(|list| {
            list.push_bundle(vec![UploadableFile::pending(describe(&"a.txt"))]);
            list.push_bundle(vec![UploadableFile::unreadable()]);
            list.set_custodian(1, "Records office");
        });
        submit(bundles, on_submit);

        let received = received.borrow();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0], bundles.get_untracked().snapshot());
        assert_eq!(received[0][1].custodian, "Records office");
        assert!(!received[0][0].files[0].complete);
        runtime.dispose();
    }

    #[test]
    fn test_hover_survives_child_enter_leave() {
        let mut hover = DragHover::default();
        assert!(!hover.is_hovering());

        hover.enter();
        // Pointer moves onto a bundle card inside the zone.
        hover.enter();
        hover.leave();
        assert!(hover.is_hovering());

        hover.leave();
        assert!(!hover.is_hovering());
        hover.leave();
        assert!(!hover.is_hovering());

        hover.enter();
        hover.enter();
        hover.reset();
        assert!(!hover.is_hovering());
    }
}
