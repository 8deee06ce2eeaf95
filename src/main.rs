//! picker-sync: copy the photos picked in a Google Photos Picker session
//! into an Azure Blob Storage container.
//!
//! A session is named either directly by ID (authorized by the stored OAuth
//! token, refreshed when expired) or through a `picker-session-*.json`
//! descriptor blob that may carry its own access token and a filename to
//! store every photo under.

#![warn(clippy::all)]

mod auth;
mod cli;
mod config;
mod picker;
mod selector;
mod storage;
mod transfer;
mod types;

use anyhow::Context;
use clap::Parser;
use reqwest::Client;
use tracing_subscriber::EnvFilter;

use config::{Config, StorageConfig};
use picker::PickerClient;
use selector::ResolvedSession;
use storage::{AzureBlobClient, BlobStore};
use types::Mode;

/// Print the session descriptors in the container, numbered from 1.
async fn run_list_sessions(store: &dyn BlobStore) -> anyhow::Result<()> {
    tracing::info!("Listing available session files...");
    let sessions = selector::list_session_files(store).await;
    if sessions.is_empty() {
        tracing::info!("No session files found");
        return Ok(());
    }

    println!("Found {} session file(s):", sessions.len());
    for (i, name) in sessions.iter().enumerate() {
        println!("  {}. {}", i + 1, name);
    }
    Ok(())
}

/// Fetch the session's media items and copy them into the container.
async fn run_session(
    picker: &PickerClient,
    store: &dyn BlobStore,
    session: ResolvedSession,
    no_progress_bar: bool,
) -> anyhow::Result<()> {
    tracing::info!("Processing Picker session: {}", session.session_id);
    let items = picker
        .fetch_media_items(&session.session_id, session.tokens.as_ref())
        .await
        .with_context(|| format!("Failed to fetch media items for {}", session.session_id))?;

    if items.is_empty() {
        anyhow::bail!(
            "No media items found in session {}. The selection may not be complete yet.",
            session.session_id
        );
    }
    tracing::info!("Found {} image(s) in session", items.len());

    let pb = transfer::create_progress_bar(no_progress_bar, items.len() as u64);
    let result = transfer::transfer_session(
        &items,
        picker,
        store,
        session.tokens.as_ref(),
        session.filename_override.as_deref(),
        &pb,
    )
    .await;

    tracing::info!("── Summary ──");
    tracing::info!(
        "  {} uploaded, {} failed, {} total",
        result.succeeded,
        result.failed,
        result.attempted
    );

    if !result.is_success() {
        anyhow::bail!(
            "{} of {} images failed to transfer",
            result.failed,
            result.attempted
        );
    }
    tracing::info!("All images transferred successfully");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = Config::from_cli(cli);
    let storage_config = StorageConfig::load(&config.storage_config)?;

    let http = Client::builder()
        .user_agent(concat!("picker-sync/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let store = AzureBlobClient::new(http.clone(), &storage_config)
        .context("Invalid Azure Storage configuration")?;

    let session = match config.mode {
        Mode::ListSessions => return run_list_sessions(&store).await,
        Mode::SessionId(id) => {
            selector::resolve_session_id(&http, &config.token_file, id).await?
        }
        Mode::SessionFile(name) => {
            selector::resolve_session_file(&store, &http, &config.token_file, &name).await?
        }
    };

    let picker = PickerClient::new(http);
    run_session(&picker, &store, session, config.no_progress_bar).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::auth::AccessToken;
    use crate::storage::memory::MemoryStore;

    fn session(id: &str) -> ResolvedSession {
        ResolvedSession {
            session_id: id.to_string(),
            tokens: Box::new(AccessToken::new("ya29.t")),
            filename_override: None,
        }
    }

    async fn serve_items(server: &MockServer, id: &str, items: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/v1/mediaItems"))
            .and(query_param("sessionId", id))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "mediaItems": items })))
            .mount(server)
            .await;
    }

    async fn serve_photo(server: &MockServer, name: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/{name}=d")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(name.as_bytes().to_vec()))
            .mount(server)
            .await;
    }

    fn picker(server: &MockServer) -> PickerClient {
        PickerClient::with_api_base(Client::new(), format!("{}/v1", server.uri()))
    }

    #[tokio::test]
    async fn test_empty_session_is_an_error() {
        let server = MockServer::start().await;
        serve_items(&server, "empty", json!([])).await;

        let store = MemoryStore::default();
        let err = run_session(&picker(&server), &store, session("empty"), true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No media items"), "{err}");
        assert_eq!(store.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_item_is_an_error() {
        let server = MockServer::start().await;
        let base = server.uri();
        serve_photo(&server, "a").await;
        serve_items(
            &server,
            "partial",
            json!([
                {"mediaFile": {"baseUrl": format!("{base}/a"), "filename": "a.jpg"}},
                {"mediaFile": {"filename": "no-url.jpg"}}
            ]),
        )
        .await;

        let store = MemoryStore::default();
        let err = run_session(&picker(&server), &store, session("partial"), true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1 of 2"), "{err}");
        assert_eq!(store.get("a.jpg").unwrap().0, b"a");
    }

    #[tokio::test]
    async fn test_all_items_transferred() {
        let server = MockServer::start().await;
        let base = server.uri();
        serve_photo(&server, "a").await;
        serve_photo(&server, "b").await;
        serve_items(
            &server,
            "done",
            json!([
                {"mediaFile": {"baseUrl": format!("{base}/a"), "filename": "a.jpg"}},
                {"baseUrl": format!("{base}/b"), "filename": "b.png", "mimeType": "image/png"}
            ]),
        )
        .await;

        let store = MemoryStore::default();
        run_session(&picker(&server), &store, session("done"), true)
            .await
            .unwrap();
        assert_eq!(store.list_blobs().await.unwrap(), ["a.jpg", "b.png"]);
        assert_eq!(store.get("b.png").unwrap().1, "image/png");
    }

    #[tokio::test]
    async fn test_fetch_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/mediaItems"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let store = MemoryStore::default();
        let err = run_session(&picker(&server), &store, session("denied"), true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to fetch media items"), "{err}");
    }
}
