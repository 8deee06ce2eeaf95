use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage account key is not valid base64: {0}")]
    InvalidKey(#[from] base64::DecodeError),

    #[error("Could not sign request: {0}")]
    Signing(#[from] hmac::digest::InvalidLength),

    #[error("Invalid blob endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("Azure Storage returned HTTP {status} for {operation} {resource}: {message}")]
    Status {
        status: u16,
        operation: &'static str,
        resource: String,
        message: String,
    },

    #[error("Invalid request header: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Could not decode blob listing: {0}")]
    Listing(#[from] quick_xml::de::DeError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
