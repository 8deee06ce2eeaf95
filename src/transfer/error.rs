use thiserror::Error;

use crate::picker::PickerError;
use crate::storage::StorageError;

/// Why a single media item was not copied. Counted, never fatal to the run.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Media item has no base URL")]
    MissingUrl,

    #[error("Failed to download image: {0}")]
    Download(#[source] PickerError),

    #[error("Failed to upload to Azure Storage: {0}")]
    Upload(#[source] StorageError),
}

impl TransferError {
    /// HTTP status behind the failure, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransferError::MissingUrl => None,
            TransferError::Download(PickerError::Download { status })
            | TransferError::Download(PickerError::Status { status, .. }) => Some(*status),
            TransferError::Upload(StorageError::Status { status, .. }) => Some(*status),
            TransferError::Download(_) | TransferError::Upload(_) => None,
        }
    }
}
