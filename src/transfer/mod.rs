//! Copies the media items of a picker session into blob storage, one item at
//! a time and in API order.

pub mod error;

pub use error::TransferError;

use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressStyle};

use crate::auth::TokenSource;
use crate::picker::{MediaItem, PickerClient};
use crate::storage::BlobStore;

/// Counts for one run. `attempted == succeeded + failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferResult {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl TransferResult {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Create a progress bar for `total` items.
///
/// Hidden when `--no-progress-bar` was passed or stdout is not a terminal.
pub fn create_progress_bar(no_progress_bar: bool, total: u64) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    )
    .map(|s| s.progress_chars("=> "))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Name the blob for the item at `index` (0-based).
fn resolve_filename(item: &MediaItem, index: usize, filename_override: Option<&str>) -> String {
    match filename_override {
        Some(name) => name.to_string(),
        None => item
            .filename()
            .map(str::to_string)
            .unwrap_or_else(|| format!("photo-{}.jpg", index + 1)),
    }
}

async fn transfer_item(
    item: &MediaItem,
    filename: &str,
    picker: &PickerClient,
    store: &dyn BlobStore,
    tokens: &dyn TokenSource,
) -> Result<(), TransferError> {
    let url = item.download_url().ok_or(TransferError::MissingUrl)?;
    let data = picker
        .download_media(&url, tokens)
        .await
        .map_err(TransferError::Download)?;

    tracing::debug!("Uploading {} to Azure Storage", filename);
    store
        .upload_blob(filename, data, item.mime_type())
        .await
        .map_err(TransferError::Upload)?;
    tracing::debug!("Uploaded to {}", store.blob_url(filename));
    Ok(())
}

/// Download every item and upload it to `store`.
///
/// A `filename_override` names every blob of the session, so with more than
/// one item each upload replaces the previous one. Per-item failures are
/// logged and counted; the loop always runs to the end.
pub async fn transfer_session(
    items: &[MediaItem],
    picker: &PickerClient,
    store: &dyn BlobStore,
    tokens: &dyn TokenSource,
    filename_override: Option<&str>,
    progress: &ProgressBar,
) -> TransferResult {
    let mut result = TransferResult::default();

    for (index, item) in items.iter().enumerate() {
        result.attempted += 1;
        let filename = resolve_filename(item, index, filename_override);

        progress.suspend(|| {
            tracing::info!("Processing image {}/{}", index + 1, items.len());
            match filename_override {
                Some(_) => tracing::info!("Custom filename: {}", filename),
                None => tracing::info!("Original filename: {}", filename),
            }
        });

        match transfer_item(item, &filename, picker, store, tokens).await {
            Ok(()) => result.succeeded += 1,
            Err(e) => {
                progress.suspend(|| {
                    tracing::error!(
                        item = item.id.as_deref().unwrap_or(""),
                        status = e.status(),
                        "Failed to transfer {}: {}",
                        filename,
                        e
                    );
                });
                result.failed += 1;
            }
        }
        progress.inc(1);
    }

    progress.finish_and_clear();
    result
}
