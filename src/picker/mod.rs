//! Google Photos Picker API client. Pages through the media items of a
//! picker session and fetches their bytes.

pub mod error;
pub mod types;

pub use error::PickerError;
pub use types::{MediaItem, SessionStatus};

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response};
use url::Url;

use crate::auth::endpoints::PICKER_API_BASE;
use crate::auth::TokenSource;
use types::{ApiErrorResponse, MediaItemsPage};

pub struct PickerClient {
    http: Client,
    api_base: String,
}

impl std::fmt::Debug for PickerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickerClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

fn bearer(tokens: &dyn TokenSource) -> String {
    format!("Bearer {}", tokens.current_token())
}

/// Pull a readable message out of an error response body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(resp) => {
            let status = resp.error.status.unwrap_or_default();
            let message = resp.error.message.unwrap_or_default();
            match (status.is_empty(), message.is_empty()) {
                (false, false) => format!("{status}: {message}"),
                (true, false) => message,
                (false, true) => status,
                (true, true) => body.to_string(),
            }
        }
        Err(_) => body.trim().to_string(),
    }
}

impl PickerClient {
    pub fn new(http: Client) -> Self {
        Self::with_api_base(http, PICKER_API_BASE)
    }

    pub fn with_api_base(http: Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn media_items_url(&self, session_id: &str, page_token: Option<&str>) -> Result<Url, PickerError> {
        let mut url = Url::parse(&format!("{}/mediaItems", self.api_base))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("sessionId", session_id);
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }
        Ok(url)
    }

    fn session_url(&self, session_id: &str) -> Result<Url, PickerError> {
        let mut url = Url::parse(&self.api_base)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push("sessions")
            .push(session_id);
        Ok(url)
    }

    /// Fetch every media item of a picker session, following `nextPageToken`
    /// until a page omits it. Items are returned in API order.
    ///
    /// On an error response the session status is checked and logged before
    /// the error is returned.
    pub async fn fetch_media_items(
        &self,
        session_id: &str,
        tokens: &dyn TokenSource,
    ) -> Result<Vec<MediaItem>, PickerError> {
        let mut all_items: Vec<MediaItem> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = self.media_items_url(session_id, page_token.as_deref())?;
            tracing::info!(
                "Fetching media items from: {}/mediaItems?sessionId={}",
                self.api_base,
                session_id
            );

            let response = self
                .http
                .get(url.clone())
                .header(AUTHORIZATION, bearer(tokens))
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let message = error_message(&body);
                tracing::error!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("")
                );
                tracing::error!("Error response: {}", message);

                self.diagnose_session(session_id, tokens).await;

                return Err(PickerError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                    message,
                });
            }

            let page: MediaItemsPage = response.json().await?;
            let next = page.next_page().map(str::to_string);
            let fetched = page.media_items.len();
            all_items.extend(page.media_items);

            tracing::info!(
                "Fetched {} items (total: {})",
                fetched,
                all_items.len()
            );

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(all_items)
    }

    /// `GET /sessions/{id}`.
    pub async fn session_status(
        &self,
        session_id: &str,
        tokens: &dyn TokenSource,
    ) -> Result<SessionStatus, PickerError> {
        let url = self.session_url(session_id)?;
        let response = self
            .http
            .get(url.clone())
            .header(AUTHORIZATION, bearer(tokens))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PickerError::Status {
                status,
                url: url.to_string(),
                message: error_message(&body),
            });
        }
        Ok(response.json().await?)
    }

    /// Log why a session's items could not be listed. Never fails.
    async fn diagnose_session(&self, session_id: &str, tokens: &dyn TokenSource) {
        tracing::info!("Checking session status...");
        match self.session_status(session_id, tokens).await {
            Ok(status) => {
                tracing::info!(
                    id = status.id.as_deref().unwrap_or(session_id),
                    media_items_set = status.media_items_set,
                    expire_time = status.expire_time.as_deref().unwrap_or("unknown"),
                    "Session status"
                );
                if let Some(pickup) = &status.pickup_token {
                    tracing::info!("Found pickup token: {}", pickup);
                    tracing::error!(
                        "This session uses a pickup token - it belongs to a different API and \
                         cannot be read through the Picker mediaItems endpoint"
                    );
                }
                if status.media_items_set {
                    tracing::error!(
                        "Session shows mediaItemsSet=true but the mediaItems endpoint failed"
                    );
                } else {
                    tracing::error!(
                        "Session exists but mediaItemsSet is false - \
                         user may not have completed selection"
                    );
                }
            }
            Err(PickerError::Status { status, .. }) => {
                tracing::error!("Session not found or expired (HTTP {})", status);
            }
            Err(e) => {
                tracing::error!("Could not check session status: {}", e);
            }
        }
    }

    /// Download the bytes behind a media URL with the current bearer token.
    pub async fn download_media(
        &self,
        url: &str,
        tokens: &dyn TokenSource,
    ) -> Result<Vec<u8>, PickerError> {
        tracing::debug!("Downloading {}", url);
        let response: Response = self
            .http
            .get(url)
            .header(AUTHORIZATION, bearer(tokens))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PickerError::Download {
                status: response.status().as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        tracing::debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}
