//! Files out of drag & drop payloads and the file picker.
//!
//! Browsers expose dropped content either as a `DataTransferItemList`
//! (which also carries strings, links, ...) or only as a plain `FileList`.
//! [`DragPayload`] models both shapes; `into_files` flattens either one
//! into the entries handed to the drop zone. An entry that claims to be a
//! file but cannot be resolved becomes `None`.

use wasm_bindgen::JsValue;
use web_sys::{DataTransfer, File, FileList};

/// `DataTransferItem.kind` of file entries.
pub const FILE_KIND: &str = "file";

/// One entry of an item-based payload.
#[derive(Clone, Debug, PartialEq)]
pub struct DragItem<F> {
    /// "file" or "string"
    pub kind: String,
    /// Resolved file, if any
    pub file: Option<F>,
}

/// Content of a drop event.
#[derive(Clone, Debug, PartialEq)]
pub enum DragPayload<F> {
    /// Structured item list (any kind of entry)
    Items(Vec<DragItem<F>>),
    /// Plain file list
    Files(Vec<F>),
}

impl<F> DragPayload<F> {
    /// File entries, in drop order.
    pub fn into_files(self) -> Vec<Option<F>> {
        match self {
            DragPayload::Items(items) => items
                .into_iter()
                .filter(|item| item.kind == FILE_KIND)
                .map(|item| item.file)
                .collect(),
            DragPayload::Files(files) => files.into_iter().map(Some).collect(),
        }
    }
}

impl DragPayload<File> {
    /// Reads a browser `DataTransfer`, preferring its `items` list.
    pub fn from_data_transfer(data: &DataTransfer) -> Self {
        let has_items = js_sys::Reflect::has(data, &JsValue::from_str("items")).unwrap_or(false);

        if has_items {
            let items = data.items();
            let entries = (0..items.length())
                .filter_map(|i| items.get(i))
                .map(|item| DragItem {
                    kind: item.kind(),
                    file: item.get_as_file().ok().flatten(),
                })
                .collect();
            DragPayload::Items(entries)
        } else {
            let files = data
                .files()
                .map(|list| files_from_list(&list).into_iter().flatten().collect())
                .unwrap_or_default();
            DragPayload::Files(files)
        }
    }
}

/// Entries of a `FileList` (file picker selection).
pub fn files_from_list(list: &FileList) -> Vec<Option<File>> {
    (0..list.length()).map(|i| list.get(i)).collect()
}
