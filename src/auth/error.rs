use std::path::PathBuf;

use thiserror::Error;

/// Operator-facing instructions for creating a token file.
pub const SIGN_IN_INSTRUCTIONS: &str = "To authenticate:\n\
    1. Open the photo picker page in your browser\n\
    2. Click 'Sign in with Google'\n\
    3. Complete the OAuth flow\n\
    4. The token will be saved for this tool to use\n\
    Note: the browser-based OAuth flow creates the token with the correct scope.";

/// Errors obtaining a usable Google OAuth credential. All of these are fatal.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No valid credentials found at {}.\n{}", path.display(), SIGN_IN_INSTRUCTIONS)]
    NoCredentials { path: PathBuf },

    #[error(
        "Failed to refresh credentials: {reason}. Deleted {}; \
         re-authenticate with the correct scope.\n{}",
        path.display(),
        SIGN_IN_INSTRUCTIONS
    )]
    RefreshFailed { path: PathBuf, reason: String },

    #[error("Failed to persist refreshed credentials to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
