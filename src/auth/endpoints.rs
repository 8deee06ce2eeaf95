/// OAuth scope the Picker API requires on the stored credential.
pub const PICKER_SCOPE: &str = "https://www.googleapis.com/auth/photospicker.mediaitems.readonly";

/// Token endpoint used when the credential file does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Base URL of the Google Photos Picker REST API.
pub const PICKER_API_BASE: &str = "https://photospicker.googleapis.com/v1";
