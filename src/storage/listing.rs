use serde::Deserialize;

use super::error::StorageError;

/// `List Blobs` response body (`<EnumerationResults>`), reduced to the
/// fields we read.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnumerationResults {
    #[serde(default)]
    blobs: BlobList,
    #[serde(default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlobList {
    #[serde(rename = "Blob", default)]
    blobs: Vec<BlobEntry>,
}

#[derive(Debug, Deserialize)]
struct BlobEntry {
    #[serde(rename = "Name")]
    name: String,
}

/// One page of a container listing.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ListingPage {
    pub names: Vec<String>,
    /// Marker for the next request; `None` on the last page.
    pub next_marker: Option<String>,
}

pub(crate) fn parse_listing(body: &str) -> Result<ListingPage, StorageError> {
    // Azure prefixes the document with a UTF-8 BOM.
    let body = body.trim_start_matches('\u{feff}');
    let results: EnumerationResults = quick_xml::de::from_str(body)?;
    Ok(ListingPage {
        names: results.blobs.blobs.into_iter().map(|b| b.name).collect(),
        next_marker: results.next_marker.filter(|m| !m.is_empty()),
    })
}
