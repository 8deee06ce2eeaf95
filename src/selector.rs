//! Session descriptors stored in the container, and the choice of token
//! source for a run.

use std::path::Path;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::{self, AccessToken, AuthError, TokenSource};
use crate::storage::{self, BlobStore, StorageError};

/// Descriptor blobs are named `picker-session-<anything>.json`.
pub const SESSION_FILE_PREFIX: &str = "picker-session-";
const SESSION_FILE_SUFFIX: &str = ".json";

#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("Could not download session file {name}: {source}")]
    Download { name: String, source: StorageError },

    #[error("Session file {name} is not valid JSON: {source}")]
    Parse {
        name: String,
        source: serde_json::Error,
    },

    #[error("No sessionId found in session file {name}")]
    MissingSessionId { name: String },

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Contents of a `picker-session-*.json` blob.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDescriptor {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub custom_filename: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl SessionDescriptor {
    fn from_slice(name: &str, data: &[u8]) -> Result<Self, SelectorError> {
        let raw: SessionDescriptor =
            serde_json::from_slice(data).map_err(|source| SelectorError::Parse {
                name: name.to_string(),
                source,
            })?;
        Ok(Self {
            session_id: non_empty(raw.session_id),
            access_token: non_empty(raw.access_token),
            custom_filename: non_empty(raw.custom_filename),
        })
    }
}

/// Everything a transfer run needs to know about its session.
pub struct ResolvedSession {
    pub session_id: String,
    pub tokens: Box<dyn TokenSource>,
    pub filename_override: Option<String>,
}

impl std::fmt::Debug for ResolvedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSession")
            .field("session_id", &self.session_id)
            .field("filename_override", &self.filename_override)
            .finish_non_exhaustive()
    }
}

pub fn is_session_file(name: &str) -> bool {
    name.starts_with(SESSION_FILE_PREFIX) && name.ends_with(SESSION_FILE_SUFFIX)
}

/// Names of the session descriptors in the container. A listing failure is
/// logged and yields an empty list.
pub async fn list_session_files(store: &dyn BlobStore) -> Vec<String> {
    storage::list_blob_names(store)
        .await
        .into_iter()
        .filter(|name| is_session_file(name))
        .collect()
}

pub async fn load_descriptor(
    store: &dyn BlobStore,
    name: &str,
) -> Result<SessionDescriptor, SelectorError> {
    tracing::info!("Loading session file: {}", name);
    let data = store
        .download_blob(name)
        .await
        .map_err(|source| SelectorError::Download {
            name: name.to_string(),
            source,
        })?;
    SessionDescriptor::from_slice(name, &data)
}

/// Session named on the command line, authorized by the stored credential.
pub async fn resolve_session_id(
    http: &Client,
    token_file: &Path,
    session_id: String,
) -> Result<ResolvedSession, SelectorError> {
    let credential = auth::obtain_credential(http, token_file).await?;
    Ok(ResolvedSession {
        session_id,
        tokens: Box::new(credential),
        filename_override: None,
    })
}

/// Session described by a descriptor blob. An embedded access token is used
/// as is; otherwise the stored credential authorizes the run.
pub async fn resolve_session_file(
    store: &dyn BlobStore,
    http: &Client,
    token_file: &Path,
    name: &str,
) -> Result<ResolvedSession, SelectorError> {
    let descriptor = load_descriptor(store, name).await?;
    let session_id = descriptor
        .session_id
        .ok_or_else(|| SelectorError::MissingSessionId {
            name: name.to_string(),
        })?;
    tracing::info!("Session ID: {}", session_id);
    if let Some(filename) = &descriptor.custom_filename {
        tracing::info!("Custom filename: {}", filename);
    }

    let tokens: Box<dyn TokenSource> = match descriptor.access_token {
        Some(token) => {
            tracing::info!("Using access token from session file");
            Box::new(AccessToken::new(token))
        }
        None => {
            tracing::info!("Session file has no access token, using stored credentials");
            Box::new(auth::obtain_credential(http, token_file).await?)
        }
    };

    Ok(ResolvedSession {
        session_id,
        tokens,
        filename_override: descriptor.custom_filename,
    })
}
