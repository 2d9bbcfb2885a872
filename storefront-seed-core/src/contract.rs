//! # contract: interfaces to the remote document store, blob store and image source
//!
//! The seeding pipeline never talks to a backend directly. Everything it needs
//! from the outside world goes through the three traits in this module:
//!
//! - [`DocumentStore`]: schemaless documents grouped into collections.
//! - [`BlobStore`]: binary files grouped into buckets, each with a view URL.
//! - [`ImageFetcher`]: retrieves the bytes behind a source image reference.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`, so tests can script failures at any call.
//! - The mocks are exported behind the `test-export-mocks` feature (on by default)
//!   so that integration tests and downstream crates can use them too.
//!
//! ## Adding New Backends
//! - Implement [`DocumentStore`] and [`BlobStore`] for the backend's client.
//! - Map transport problems to [`StoreError::Transport`] and non-success
//!   responses to [`StoreError::Rejected`]; the orchestrator treats both as fatal.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// A schemaless field bag, exactly as stored in a document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// A document as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-assigned unique identifier.
    pub id: String,
    /// User fields only; store metadata (`$`-prefixed keys) is stripped by adapters.
    pub fields: Fields,
}

/// A file as returned by the blob store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

/// Everything needed to create a new file in a bucket.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Identifier generated by the caller.
    pub id: String,
    /// Display filename.
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub bytes: Vec<u8>,
}

/// Bytes retrieved from a source image reference.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Failure of a single call to an external service.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The request never produced a response (DNS, TLS, connection reset, ...).
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The service answered, but not with anything we understand.
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Remote document store: named collections of schemaless documents.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List documents in a collection.
    ///
    /// Implementations may return a single page; callers that need every
    /// document (such as purge) keep listing until the result is empty.
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Create a document under the given id. Either the full record is stored or nothing is.
    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document, StoreError>;

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// Blob store: buckets of binary files, each addressable by id.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// List files in a bucket. May return a single page, like [`DocumentStore::list_documents`].
    async fn list_files(&self, bucket: &str) -> Result<Vec<StoredFile>, StoreError>;

    async fn create_file(&self, bucket: &str, file: NewFile) -> Result<StoredFile, StoreError>;

    async fn delete_file(&self, bucket: &str, id: &str) -> Result<(), StoreError>;

    /// Stable URL under which the file can be displayed.
    fn file_view_url(&self, bucket: &str, id: &str) -> String;
}

/// Retrieves the bytes behind a source image reference.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, StoreError>;
}
