use thiserror::Error;

#[derive(Debug, Error)]
pub enum PickerError {
    #[error("Picker API returned HTTP {status} for {url}: {message}")]
    Status {
        status: u16,
        url: String,
        message: String,
    },

    #[error("Failed to download media (HTTP {status})")]
    Download { status: u16 },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Invalid Picker API URL: {0}")]
    Url(#[from] url::ParseError),
}
