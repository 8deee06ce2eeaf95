use serde::Deserialize;

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// File-level fields of a picked media item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// One item of a picker session.
///
/// The Picker API nests the file fields under `mediaFile`; older responses
/// carry them at the top level. Both shapes deserialize into this type and
/// the nested one wins when present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub media_file: Option<MediaFile>,
    #[serde(flatten)]
    pub inline: MediaFile,
}

impl MediaItem {
    fn file(&self) -> &MediaFile {
        self.media_file.as_ref().unwrap_or(&self.inline)
    }

    pub fn base_url(&self) -> Option<&str> {
        self.file().base_url.as_deref().filter(|u| !u.is_empty())
    }

    pub fn filename(&self) -> Option<&str> {
        self.file().filename.as_deref().filter(|f| !f.is_empty())
    }

    pub fn mime_type(&self) -> &str {
        self.file()
            .mime_type
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE)
    }

    /// URL for the full-resolution bytes. The `=d` suffix asks the Picker
    /// CDN for the original file rather than a resized rendition.
    pub fn download_url(&self) -> Option<String> {
        self.base_url().map(|base| format!("{base}=d"))
    }
}

/// One page of `GET /mediaItems`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItemsPage {
    #[serde(default)]
    pub media_items: Vec<MediaItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl MediaItemsPage {
    /// The continuation token, treating an empty string as the last page.
    pub fn next_page(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Subset of `GET /sessions/{id}` used for diagnostics.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub media_items_set: bool,
    #[serde(default)]
    pub pickup_token: Option<String>,
    #[serde(default)]
    pub expire_time: Option<String>,
}

/// Google API error envelope: `{"error": {"message", "status", ..}}`.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_media_item() {
        let json = r#"{
            "id": "AF1Qip",
            "createTime": "2025-01-01T10:00:00Z",
            "type": "PHOTO",
            "mediaFile": {
                "baseUrl": "https://lh3.googleusercontent.com/abc",
                "mimeType": "image/heic",
                "filename": "IMG_0001.HEIC",
                "mediaFileMetadata": {"width": 4032, "height": 3024}
            }
        }"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id.as_deref(), Some("AF1Qip"));
        assert_eq!(item.filename(), Some("IMG_0001.HEIC"));
        assert_eq!(item.mime_type(), "image/heic");
        assert_eq!(
            item.download_url().as_deref(),
            Some("https://lh3.googleusercontent.com/abc=d")
        );
    }

    #[test]
    fn test_flat_media_item() {
        let json = r#"{
            "id": "x",
            "baseUrl": "https://lh3.googleusercontent.com/flat",
            "mimeType": "image/png",
            "filename": "flat.png"
        }"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.filename(), Some("flat.png"));
        assert_eq!(item.mime_type(), "image/png");
        assert_eq!(item.base_url(), Some("https://lh3.googleusercontent.com/flat"));
    }

    #[test]
    fn test_nested_shape_wins_over_flat() {
        let json = r#"{
            "filename": "top.jpg",
            "mediaFile": {"filename": "nested.jpg", "baseUrl": "https://x/n"}
        }"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.filename(), Some("nested.jpg"));
    }

    #[test]
    fn test_missing_fields_default() {
        let item: MediaItem = serde_json::from_str(r#"{"mediaFile": {}}"#).unwrap();
        assert!(item.base_url().is_none());
        assert!(item.download_url().is_none());
        assert!(item.filename().is_none());
        assert_eq!(item.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_empty_base_url_is_missing() {
        let item: MediaItem =
            serde_json::from_str(r#"{"mediaFile": {"baseUrl": ""}}"#).unwrap();
        assert!(item.download_url().is_none());
    }

    #[test]
    fn test_page_without_token_is_last() {
        let page: MediaItemsPage = serde_json::from_str(r#"{"mediaItems": []}"#).unwrap();
        assert!(page.next_page().is_none());
        let page: MediaItemsPage =
            serde_json::from_str(r#"{"mediaItems": [], "nextPageToken": ""}"#).unwrap();
        assert!(page.next_page().is_none());
        let page: MediaItemsPage = serde_json::from_str(r#"{}"#).unwrap();
        assert!(page.media_items.is_empty());
    }

    #[test]
    fn test_session_status() {
        let status: SessionStatus = serde_json::from_str(
            r#"{"id": "s1", "pickerUri": "https://photos.google.com/picker/x", "mediaItemsSet": true}"#,
        )
        .unwrap();
        assert!(status.media_items_set);
        assert!(status.pickup_token.is_none());
    }
}
