//! Google OAuth credentials for the Picker API.
//!
//! Two ways to authorize a run: the token file written by the browser
//! sign-in flow (refreshed here when expired), or an access token passed
//! through a session descriptor. Both are exposed to the rest of the crate
//! as a [`TokenSource`].

pub mod credential;
pub mod endpoints;
pub mod error;
pub mod responses;

use std::path::Path;

use chrono::Utc;
use reqwest::Client;

pub use self::credential::Credential;
pub use self::error::AuthError;

/// Supplies the bearer token for Picker API calls.
pub trait TokenSource: Send + Sync {
    fn current_token(&self) -> &str;
}

impl TokenSource for Credential {
    fn current_token(&self) -> &str {
        &self.token
    }
}

/// An access token handed to us directly, e.g. embedded in a session
/// descriptor. Never refreshed.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

impl TokenSource for AccessToken {
    fn current_token(&self) -> &str {
        &self.0
    }
}

/// Load the stored credential, refreshing it if it has expired.
///
/// 1. Missing file → [`AuthError::NoCredentials`].
/// 2. Corrupt file or wrong scope → file deleted, then as (1).
/// 3. Valid token → returned unchanged.
/// 4. Expired with a refresh token → one refresh attempt; on success the
///    file is rewritten, on failure it is deleted.
/// 5. Expired without a refresh token → file deleted, then as (1).
pub async fn obtain_credential(http: &Client, token_path: &Path) -> Result<Credential, AuthError> {
    let no_credentials = || AuthError::NoCredentials {
        path: token_path.to_path_buf(),
    };

    let mut credential = credential::load_or_discard(token_path)
        .await
        .ok_or_else(no_credentials)?;

    if credential.is_valid(Utc::now()) {
        tracing::debug!("Stored credentials are valid");
        return Ok(credential);
    }

    if !credential.can_refresh() {
        tracing::info!(
            "Credentials expired and cannot be refreshed; deleting {}",
            token_path.display()
        );
        credential::discard(token_path).await;
        return Err(no_credentials());
    }

    tracing::info!("Refreshing expired credentials...");
    if let Err(e) = credential.refresh(http).await {
        tracing::info!(
            "Deleting {} - you'll need to re-authenticate",
            token_path.display()
        );
        credential::discard(token_path).await;
        return Err(AuthError::RefreshFailed {
            path: token_path.to_path_buf(),
            reason: format!("{e:#}"),
        });
    }

    credential.persist(token_path).await?;
    tracing::info!(
        "Credentials refreshed and saved to {}",
        token_path.display()
    );
    Ok(credential)
}
