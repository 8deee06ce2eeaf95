//! Azure Blob Storage access for the configured container.

pub mod error;
mod listing;
#[cfg(test)]
pub(crate) mod memory;
mod signing;

pub use error::StorageError;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use url::Url;

use crate::config::StorageConfig;

/// REST API version sent with every request.
const API_VERSION: &str = "2021-08-06";

/// Named blobs in one container.
///
/// Upload has overwrite semantics: an existing blob with the same name is
/// replaced unconditionally.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Names of every blob in the container.
    async fn list_blobs(&self) -> Result<Vec<String>, StorageError>;

    async fn download_blob(&self, name: &str) -> Result<Vec<u8>, StorageError>;

    async fn upload_blob(
        &self,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Public URL of a blob, for logging.
    fn blob_url(&self, name: &str) -> String;
}

/// List the container, degrading any failure to an empty list.
pub async fn list_blob_names(store: &dyn BlobStore) -> Vec<String> {
    match store.list_blobs().await {
        Ok(names) => names,
        Err(e) => {
            tracing::error!("Error listing blobs from Azure Storage: {}", e);
            Vec::new()
        }
    }
}

/// [`BlobStore`] backed by the Azure Blob REST API with Shared Key auth.
pub struct AzureBlobClient {
    http: Client,
    account: String,
    key: Vec<u8>,
    container_url: Url,
}

impl std::fmt::Debug for AzureBlobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureBlobClient")
            .field("account", &self.account)
            .field("container_url", &self.container_url.as_str())
            .finish_non_exhaustive()
    }
}

impl AzureBlobClient {
    pub fn new(http: Client, config: &StorageConfig) -> Result<Self, StorageError> {
        let key = BASE64.decode(config.account_key.trim())?;
        let endpoint = match &config.blob_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://{}.blob.core.windows.net", config.account_name),
        };
        let mut container_url = Url::parse(&endpoint)?;
        container_url
            .path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(&config.container_name);

        Ok(Self {
            http,
            account: config.account_name.clone(),
            key,
            container_url,
        })
    }

    fn blob_location(&self, name: &str) -> Url {
        let mut url = self.container_url.clone();
        // container_url was validated as a base URL in `new`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(name);
        }
        url
    }

    /// Sign and send a request. Caller headers are signed along with the
    /// `x-ms-date`/`x-ms-version` pair added here.
    async fn send(
        &self,
        method: Method,
        url: Url,
        mut headers: HeaderMap,
        body: Option<Vec<u8>>,
    ) -> Result<Response, StorageError> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        headers.insert(HeaderName::from_static("x-ms-date"), HeaderValue::from_str(&date)?);
        headers.insert(
            HeaderName::from_static("x-ms-version"),
            HeaderValue::from_static(API_VERSION),
        );
        if let Some(body) = &body {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        }
        let auth =
            signing::authorization(&self.key, &self.account, method.as_str(), &headers, &url)?;
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&auth)?);

        tracing::debug!("{} {}", method, url);
        let mut builder = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        Ok(builder.send().await?)
    }

    fn check(
        response: Response,
        operation: &'static str,
        resource: &str,
    ) -> Result<Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .headers()
            .get("x-ms-error-code")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
        Err(StorageError::Status {
            status: status.as_u16(),
            operation,
            resource: resource.to_string(),
            message,
        })
    }
}

#[async_trait::async_trait]
impl BlobStore for AzureBlobClient {
    async fn list_blobs(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut url = self.container_url.clone();
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("restype", "container");
                query.append_pair("comp", "list");
                if let Some(m) = &marker {
                    query.append_pair("marker", m);
                }
            }
            let response = self.send(Method::GET, url, HeaderMap::new(), None).await?;
            let response = Self::check(response, "list", self.container_url.as_str())?;
            let body = response.text().await?;
            let page = listing::parse_listing(&body)?;
            names.extend(page.names);
            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        tracing::debug!("Found {} blob(s) in Azure Storage", names.len());
        Ok(names)
    }

    async fn download_blob(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let url = self.blob_location(name);
        let response = self.send(Method::GET, url, HeaderMap::new(), None).await?;
        let response = Self::check(response, "download", name)?;
        let bytes = response.bytes().await?;
        tracing::debug!("Downloaded blob {} ({} bytes)", name, bytes.len());
        Ok(bytes.to_vec())
    }

    async fn upload_blob(
        &self,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let url = self.blob_location(name);
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-ms-blob-type"),
            HeaderValue::from_static("BlockBlob"),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type)?);
        let response = self.send(Method::PUT, url, headers, Some(data)).await?;
        Self::check(response, "upload", name)?;
        Ok(())
    }

    fn blob_url(&self, name: &str) -> String {
        self.blob_location(name).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_bytes, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AzureBlobClient {
        let config = StorageConfig {
            account_name: "acct".into(),
            account_key: BASE64.encode(b"test-key"),
            container_name: "photos".into(),
            blob_endpoint: Some(server.uri()),
        };
        AzureBlobClient::new(Client::new(), &config).unwrap()
    }

    #[test]
    fn test_default_endpoint() {
        let config = StorageConfig {
            account_name: "acct".into(),
            account_key: BASE64.encode(b"k"),
            container_name: "photos".into(),
            blob_endpoint: None,
        };
        let client = AzureBlobClient::new(Client::new(), &config).unwrap();
        assert_eq!(
            client.blob_url("IMG 1.jpg"),
            "https://acct.blob.core.windows.net/photos/IMG%201.jpg"
        );
    }

    #[test]
    fn test_invalid_key_rejected() {
        let config = StorageConfig {
            account_name: "acct".into(),
            account_key: "not base64!!".into(),
            container_name: "photos".into(),
            blob_endpoint: None,
        };
        assert!(matches!(
            AzureBlobClient::new(Client::new(), &config),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_list_blobs_follows_marker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/photos"))
            .and(query_param("comp", "list"))
            .and(query_param("marker", "m2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<?xml version=\"1.0\" encoding=\"utf-8\"?><EnumerationResults>\
                 <Blobs><Blob><Name>c.jpg</Name></Blob></Blobs><NextMarker/></EnumerationResults>",
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/photos"))
            .and(query_param("restype", "container"))
            .and(query_param("comp", "list"))
            .and(header("x-ms-version", API_VERSION))
            .and(header_exists("x-ms-date"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<?xml version=\"1.0\" encoding=\"utf-8\"?><EnumerationResults>\
                 <Blobs><Blob><Name>a.json</Name></Blob><Blob><Name>b.jpg</Name></Blob></Blobs>\
                 <NextMarker>m2</NextMarker></EnumerationResults>",
            ))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let names = client_for(&server).list_blobs().await.unwrap();
        assert_eq!(names, ["a.json", "b.jpg", "c.jpg"]);
    }

    #[tokio::test]
    async fn test_list_blob_names_degrades_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/photos"))
            .respond_with(
                ResponseTemplate::new(403).insert_header("x-ms-error-code", "AuthenticationFailed"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.list_blobs().await,
            Err(StorageError::Status { status: 403, .. })
        ));
        assert!(list_blob_names(&client).await.is_empty());
    }

    #[tokio::test]
    async fn test_download_blob() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/photos/picker-session-1.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"sessionId":"s"}"#))
            .mount(&server)
            .await;

        let bytes = client_for(&server)
            .download_blob("picker-session-1.json")
            .await
            .unwrap();
        assert_eq!(bytes, br#"{"sessionId":"s"}"#);
    }

    #[tokio::test]
    async fn test_download_missing_blob() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/photos/missing.json"))
            .respond_with(ResponseTemplate::new(404).insert_header("x-ms-error-code", "BlobNotFound"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .download_blob("missing.json")
            .await
            .unwrap_err();
        match err {
            StorageError::Status {
                status, message, ..
            } => {
                assert_eq!(status, 404);
                assert_eq!(message, "BlobNotFound");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_blob_sets_type_and_overwrites() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/photos/IMG_0001.HEIC"))
            .and(header("x-ms-blob-type", "BlockBlob"))
            .and(header("content-type", "image/heic"))
            .and(body_bytes(vec![1u8, 2, 3]))
            .respond_with(ResponseTemplate::new(201))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .upload_blob("IMG_0001.HEIC", vec![1, 2, 3], "image/heic")
            .await
            .unwrap();
        client
            .upload_blob("IMG_0001.HEIC", vec![1, 2, 3], "image/heic")
            .await
            .unwrap();
    }
}
