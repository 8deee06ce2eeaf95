//! Persisted Google OAuth credential (the "authorized user" JSON document
//! written by the browser sign-in flow).

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::fs;

use super::endpoints::{DEFAULT_TOKEN_URI, PICKER_SCOPE};
use super::error::AuthError;
use super::responses::{TokenErrorResponse, TokenRefreshResponse};

/// A token expiring within this many seconds is already treated as expired,
/// matching google-auth's refresh threshold (3m45s).
const REFRESH_THRESHOLD_SECS: i64 = 225;

/// Scopes are written as a JSON list by google-auth, but some tools write a
/// single space-separated string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scopes {
    List(Vec<String>),
    Joined(String),
}

impl Scopes {
    fn contains(&self, scope: &str) -> bool {
        match self {
            Scopes::List(list) => list.iter().any(|s| s == scope),
            Scopes::Joined(joined) => joined.split_whitespace().any(|s| s == scope),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    #[serde(alias = "access_token")]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Scopes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    /// Fields we don't interpret, kept so a rewrite doesn't drop them.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_uri", &self.token_uri)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl Credential {
    /// Expired once `now` is within the refresh threshold of `expiry`.
    /// A credential without an expiry never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now >= expiry - Duration::seconds(REFRESH_THRESHOLD_SECS),
            None => false,
        }
    }

    /// Directly usable as a bearer token.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && !self.is_expired(now)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// An empty or absent scope list is accepted; a list that omits the
    /// Picker scope was granted for something else.
    fn has_picker_scope(&self) -> bool {
        match &self.scopes {
            Some(Scopes::List(list)) if list.is_empty() => true,
            Some(Scopes::Joined(joined)) if joined.trim().is_empty() => true,
            Some(scopes) => scopes.contains(PICKER_SCOPE),
            None => true,
        }
    }

    /// Exchange the refresh token for a new access token, updating this
    /// credential in place. Makes exactly one request.
    pub async fn refresh(&mut self, http: &Client) -> anyhow::Result<()> {
        let refresh_token = self
            .refresh_token
            .clone()
            .context("Credential has no refresh token")?;
        let token_uri = self
            .token_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];
        if let Some(id) = &self.client_id {
            form.push(("client_id", id.as_str()));
        }
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        tracing::debug!("POST {}", token_uri);
        let response = http.post(&token_uri).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => anyhow::bail!("HTTP {}: {}", status.as_u16(), err),
                Err(_) => anyhow::bail!("HTTP {}", status.as_u16()),
            }
        }

        let refreshed: TokenRefreshResponse = response
            .json()
            .await
            .context("Token endpoint returned an unreadable response")?;
        let now = Utc::now();
        self.token = refreshed.access_token;
        self.expiry = refreshed
            .expires_in
            .map(|secs| now + Duration::seconds(secs));
        if let Some(rotated) = refreshed.refresh_token {
            self.refresh_token = Some(rotated);
        }
        if let Some(scope) = refreshed.scope {
            self.scopes = Some(Scopes::List(
                scope.split_whitespace().map(String::from).collect(),
            ));
        }
        Ok(())
    }

    /// Write the credential next to `path` and rename it into place so a
    /// crash mid-write never leaves a truncated token file.
    pub async fn persist(&self, path: &Path) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp_path = temp_path(path);
        let io_err = |source| AuthError::Persist {
            path: path.to_path_buf(),
            source,
        };

        fs::write(&tmp_path, json).await.map_err(io_err)?;
        #[cfg(unix)]
        {
            // Token files hold bearer credentials, owner-only
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(io_err)?;
        }
        fs::rename(&tmp_path, path).await.map_err(io_err)?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Load the credential at `path`.
///
/// Returns `None` when the file is absent. A file that can't be read, can't
/// be parsed, or was granted without the Picker scope is deleted and also
/// yields `None`.
pub async fn load_or_discard(path: &Path) -> Option<Credential> {
    if !path.exists() {
        tracing::debug!("Token file {} does not exist", path.display());
        return None;
    }

    let parsed = match fs::read_to_string(path).await {
        Ok(contents) => serde_json::from_str::<Credential>(&contents)
            .map_err(anyhow::Error::from)
            .and_then(|cred| {
                if cred.has_picker_scope() {
                    Ok(cred)
                } else {
                    Err(anyhow::anyhow!("token was not granted {}", PICKER_SCOPE))
                }
            }),
        Err(e) => Err(e.into()),
    };

    match parsed {
        Ok(cred) => {
            tracing::debug!("Loaded credentials from {}", path.display());
            Some(cred)
        }
        Err(e) => {
            tracing::warn!("Could not load existing credentials: {}", e);
            tracing::info!("Will delete old token file and require re-authentication");
            discard(path).await;
            None
        }
    }
}

/// Delete the token file, logging rather than failing if that isn't possible.
pub async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        tracing::warn!("Failed to delete {}: {}", path.display(), e);
    }
}
