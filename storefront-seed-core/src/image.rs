//! Image import: re-hosts a source image in the blob store.
//!
//! The bytes are fetched from the source reference, uploaded under a freshly
//! generated id, and the blob store's view URL for the new file is returned.
//! Downstream documents only ever store that view URL.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, error, info};

use crate::contract::{BlobStore, FetchedImage, ImageFetcher, NewFile, StoreError};
use crate::error::SeedError;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Result of re-hosting one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedImage {
    pub file_id: String,
    pub file_name: String,
    pub view_url: String,
}

/// Fetches images over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, StoreError> {
        debug!(url = %url, "[IMAGE] Fetching source image");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .text()
                .await
                .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let bytes = resp.bytes().await?.to_vec();
        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}

/// Fetches `url` and uploads it to `bucket`, returning the re-hosted reference.
pub async fn import_image<F, B>(
    fetcher: &F,
    blobs: &B,
    bucket: &str,
    url: &str,
) -> Result<ImportedImage, SeedError>
where
    F: ImageFetcher + ?Sized,
    B: BlobStore + ?Sized,
{
    let image = fetcher.fetch(url).await.map_err(|e| {
        error!(url = %url, error = %e, "[IMAGE][ERROR] Fetch failed");
        SeedError::ImageFetch {
            url: url.to_string(),
            source: e,
        }
    })?;

    let file_name = derive_file_name(url, unix_millis());
    let new_file = NewFile {
        id: crate::new_id(),
        name: file_name.clone(),
        content_type: image.content_type,
        size: image.bytes.len() as u64,
        bytes: image.bytes,
    };
    debug!(
        url = %url,
        file_name = %new_file.name,
        content_type = %new_file.content_type,
        size = new_file.size,
        "[IMAGE] Uploading image"
    );

    let stored = blobs.create_file(bucket, new_file).await.map_err(|e| {
        error!(url = %url, bucket = %bucket, error = %e, "[IMAGE][ERROR] Upload failed");
        SeedError::ImageUpload {
            url: url.to_string(),
            bucket: bucket.to_string(),
            source: e,
        }
    })?;

    let view_url = blobs.file_view_url(bucket, &stored.id);
    info!(url = %url, file_id = %stored.id, view_url = %view_url, "[IMAGE] Imported image");
    Ok(ImportedImage {
        file_id: stored.id,
        file_name,
        view_url,
    })
}

/// Filename for an uploaded image: the last path segment of the reference,
/// or `file-<millis>.jpg` when the reference ends without one.
pub fn derive_file_name(url: &str, now_millis: u128) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    match path.rsplit('/').next().map(str::trim) {
        Some(segment) if !segment.is_empty() => segment.to_string(),
        _ => format!("file-{now_millis}.jpg"),
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{MockBlobStore, MockImageFetcher, StoredFile};
    use std::sync::{Arc, Mutex};

    #[test]
    fn file_name_is_last_path_segment() {
        assert_eq!(
            derive_file_name("https://cdn.example.com/menu/burger.png", 1),
            "burger.png"
        );
        assert_eq!(
            derive_file_name("https://cdn.example.com/menu/burger.png?w=200#top", 1),
            "burger.png"
        );
    }

    #[test]
    fn file_name_falls_back_without_segment() {
        assert_eq!(
            derive_file_name("https://cdn.example.com/menu/", 42),
            "file-42.jpg"
        );
        assert_eq!(derive_file_name("", 7), "file-7.jpg");
    }

    #[tokio::test]
    async fn import_uploads_fetched_bytes_and_returns_view_url() {
        let mut fetcher = MockImageFetcher::new();
        fetcher.expect_fetch().times(1).returning(|_| {
            Ok(FetchedImage {
                bytes: vec![1, 2, 3, 4],
                content_type: "image/png".into(),
            })
        });

        let uploaded: Arc<Mutex<Option<NewFile>>> = Arc::new(Mutex::new(None));
        let seen = uploaded.clone();
        let mut blobs = MockBlobStore::new();
        blobs
            .expect_create_file()
            .times(1)
            .returning(move |_bucket, file| {
                let stored = StoredFile {
                    id: file.id.clone(),
                    name: file.name.clone(),
                    mime_type: file.content_type.clone(),
                    size: file.size,
                };
                *seen.lock().unwrap() = Some(file);
                Ok(stored)
            });
        blobs
            .expect_file_view_url()
            .returning(|bucket, id| format!("https://blobs.test/{bucket}/{id}/view"));

        let imported = import_image(
            &fetcher,
            &blobs,
            "images",
            "https://cdn.example.com/menu/burger.png",
        )
        .await
        .expect("import succeeds");

        let file = uploaded.lock().unwrap().take().expect("file uploaded");
        assert_eq!(file.name, "burger.png");
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.size, 4);
        assert_eq!(imported.file_name, "burger.png");
        assert_eq!(
            imported.view_url,
            format!("https://blobs.test/images/{}/view", file.id)
        );
    }

    #[tokio::test]
    async fn fetch_failure_skips_upload() {
        let mut fetcher = MockImageFetcher::new();
        fetcher.expect_fetch().returning(|_| {
            Err(StoreError::Rejected {
                status: 404,
                message: "not found".into(),
            })
        });
        let mut blobs = MockBlobStore::new();
        blobs.expect_create_file().never();

        let err = import_image(&fetcher, &blobs, "images", "https://cdn.example.com/x.png")
            .await
            .unwrap_err();
        assert!(matches!(err, SeedError::ImageFetch { .. }), "got {err:?}");
    }
}
