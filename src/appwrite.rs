#![doc = "Appwrite integration: implements the core store traits against the Appwrite REST API."]
//
//! # Appwrite Store (CLI <-> Core)
//!
//! This module bridges the seeding pipeline in `storefront-seed-core` to a real
//! Appwrite project. [`AppwriteClient`] implements both
//! [`DocumentStore`] (databases API) and [`BlobStore`] (storage API).
//!
//! ## Client Usage
//! - Construct with [`AppwriteClient::new`] from loaded [`AppwriteSettings`];
//!   the API key must have been injected from `APPWRITE_API_KEY`.
//! - Every request carries `X-Appwrite-Project` and `X-Appwrite-Key`.
//! - Listings ask for pages of [`PAGE_SIZE`]; the purge loop re-lists until empty.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use storefront_seed_core::contract::{
    BlobStore, Document, DocumentStore, Fields, NewFile, StoreError, StoredFile,
};

use crate::load_config::{AppwriteSettings, API_KEY_ENV};

/// Documents or files requested per listing call.
pub const PAGE_SIZE: usize = 100;

/// Largest file Appwrite accepts in a single, non-chunked upload.
const MAX_SINGLE_UPLOAD: u64 = 5 * 1024 * 1024;

pub struct AppwriteClient {
    http: Client,
    endpoint: String,
    project_id: String,
    database_id: String,
}

#[derive(Debug, Deserialize)]
struct DocumentList {
    documents: Vec<Fields>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    files: Vec<FileResponse>,
}

#[derive(Debug, Deserialize)]
struct FileResponse {
    #[serde(rename = "$id")]
    id: String,
    name: String,
    #[serde(rename = "mimeType", default)]
    mime_type: String,
    #[serde(rename = "sizeOriginal", default)]
    size: u64,
}

impl From<FileResponse> for StoredFile {
    fn from(f: FileResponse) -> Self {
        StoredFile {
            id: f.id,
            name: f.name,
            mime_type: f.mime_type,
            size: f.size,
        }
    }
}

impl AppwriteClient {
    pub fn new(settings: &AppwriteSettings) -> anyhow::Result<Self> {
        let api_key = settings.api_key.as_deref().ok_or_else(|| {
            tracing::error!("{API_KEY_ENV} missing in environment");
            anyhow::anyhow!("{API_KEY_ENV} environment variable not set")
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Appwrite-Project",
            HeaderValue::from_str(&settings.project_id)?,
        );
        let mut key = HeaderValue::from_str(api_key)?;
        key.set_sensitive(true);
        headers.insert("X-Appwrite-Key", key);

        let http = Client::builder().default_headers(headers).build()?;
        tracing::info!(
            endpoint = %settings.endpoint,
            project_id = %settings.project_id,
            database_id = %settings.database_id,
            "Initialized AppwriteClient"
        );
        Ok(Self {
            http,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            project_id: settings.project_id.clone(),
            database_id: settings.database_id.clone(),
        })
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.endpoint, self.database_id, collection
        )
    }

    fn files_url(&self, bucket: &str) -> String {
        format!("{}/storage/buckets/{}/files", self.endpoint, bucket)
    }
}

fn limit_query() -> String {
    json!({ "method": "limit", "values": [PAGE_SIZE] }).to_string()
}

/// Passes successful responses through and turns everything else into [`StoreError::Rejected`].
async fn check(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Appwrite errors carry a JSON body with a `message` field; fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Splits a raw Appwrite document into its id and its user fields.
fn into_document(mut raw: Fields) -> Result<Document, StoreError> {
    let id = match raw.remove("$id") {
        Some(Value::String(id)) => id,
        other => {
            return Err(StoreError::Decode(format!(
                "document without a string $id: {other:?}"
            )))
        }
    };
    raw.retain(|key, _| !key.starts_with('$'));
    Ok(Document { id, fields: raw })
}

#[async_trait]
impl DocumentStore for AppwriteClient {
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        tracing::debug!(collection, "Listing documents");
        let resp = self
            .http
            .get(self.documents_url(collection))
            .query(&[("queries[]", limit_query())])
            .send()
            .await?;
        let list: DocumentList = check(resp).await?.json().await?;
        tracing::info!(
            collection,
            count = list.documents.len(),
            "Fetched documents in collection"
        );
        list.documents.into_iter().map(into_document).collect()
    }

    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        tracing::info!(collection, document_id = id, "Creating document");
        let body = json!({ "documentId": id, "data": fields });
        let resp = self
            .http
            .post(self.documents_url(collection))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, collection, "Transport error creating document");
                e
            })?;
        let raw: Fields = check(resp).await?.json().await?;
        let doc = into_document(raw)?;
        tracing::info!(collection, document_id = %doc.id, "Successfully created document");
        Ok(doc)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        tracing::debug!(collection, document_id = id, "Deleting document");
        let resp = self
            .http
            .delete(format!("{}/{}", self.documents_url(collection), id))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for AppwriteClient {
    async fn list_files(&self, bucket: &str) -> Result<Vec<StoredFile>, StoreError> {
        tracing::debug!(bucket, "Listing files");
        let resp = self
            .http
            .get(self.files_url(bucket))
            .query(&[("queries[]", limit_query())])
            .send()
            .await?;
        let list: FileList = check(resp).await?.json().await?;
        tracing::info!(bucket, count = list.files.len(), "Fetched files in bucket");
        Ok(list.files.into_iter().map(StoredFile::from).collect())
    }

    async fn create_file(&self, bucket: &str, file: NewFile) -> Result<StoredFile, StoreError> {
        tracing::info!(
            bucket,
            file_id = %file.id,
            name = %file.name,
            content_type = %file.content_type,
            size = file.size,
            "Uploading file"
        );
        if file.size > MAX_SINGLE_UPLOAD {
            return Err(StoreError::Rejected {
                status: 413,
                message: format!(
                    "{} is {} bytes; chunked uploads above {MAX_SINGLE_UPLOAD} bytes are not supported",
                    file.name, file.size
                ),
            });
        }
        let part = Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.content_type)?;
        let form = Form::new().text("fileId", file.id).part("file", part);
        let resp = self
            .http
            .post(self.files_url(bucket))
            .multipart(form)
            .send()
            .await?;
        let stored: FileResponse = check(resp).await?.json().await?;
        tracing::info!(bucket, file_id = %stored.id, "Successfully uploaded file");
        Ok(stored.into())
    }

    async fn delete_file(&self, bucket: &str, id: &str) -> Result<(), StoreError> {
        tracing::debug!(bucket, file_id = id, "Deleting file");
        let resp = self
            .http
            .delete(format!("{}/{}", self.files_url(bucket), id))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    fn file_view_url(&self, bucket: &str, id: &str) -> String {
        format!(
            "{}/{}/view?project={}",
            self.files_url(bucket),
            id,
            self.project_id
        )
    }
}
