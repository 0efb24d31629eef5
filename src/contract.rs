//! # contract: the remote blob store seam
//!
//! This module defines the single trait ([`BlobStore`]) the publish pipeline
//! talks to, together with the plain data types crossing it: content-addressed
//! [`Blob`]s and their [`BlobRef`]s.
//!
//! ## Interface
//! - [`BlobStore::query`] runs a search expression and returns matching permanodes.
//! - [`BlobStore::sign`] has the store sign a schema blob with its own identity.
//! - [`BlobStore::put_multi`] uploads a batch of blobs in one request.
//!
//! Content addressing is local: [`Blob::new`] computes the reference, the store
//! only receives finished blobs.
//!
//! ## Mocking & Testing
//! The trait is annotated for `mockall`; with the default `test-export-mocks`
//! feature `MockBlobStore` is available to integration tests.

use std::fmt;

use async_trait::async_trait;
use mockall::automock;
use serde_json::{Map, Value};
use sha2::{Digest, Sha224};

/// Error type for [`BlobStore`] calls.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Reference to a content-addressed blob, e.g. `sha224-6f2a...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobRef(String);

impl BlobRef {
    pub const HASH_NAME: &'static str = "sha224";

    /// Reference of `data` under the store's hash function.
    pub fn for_bytes(data: &[u8]) -> Self {
        let digest = Sha224::digest(data);
        BlobRef(format!("{}-{:x}", Self::HASH_NAME, digest))
    }

    /// Wraps a reference received from the store. Any `<hash>-<hex>` is accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        let (hash, hex) = raw.split_once('-')?;
        if hash.is_empty() || hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(BlobRef(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable bytes plus their content address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    blob_ref: BlobRef,
    data: Vec<u8>,
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            blob_ref: BlobRef::for_bytes(&data),
            data,
        }
    }

    /// Serializes a JSON map (keys in insertion order) into a blob.
    pub fn from_json(map: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::to_vec(map)?))
    }

    pub fn blob_ref(&self) -> &BlobRef {
        &self.blob_ref
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Capability of the remote content-addressed store used for publishing.
///
/// Implemented by the HTTP client in [`crate::upload`] and by test doubles.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Permanodes matching a search expression such as `attr:asId:"..."`.
    async fn query(&self, expression: &str) -> Result<Vec<BlobRef>, StoreError>;

    /// Signs an unsigned schema map with the store's identity.
    ///
    /// The implementor adds the signer reference; the returned blob is ready to upload.
    async fn sign(&self, unsigned: Map<String, Value>) -> Result<Blob, StoreError>;

    /// Uploads all blobs in a single request.
    async fn put_multi(&self, blobs: Vec<Blob>) -> Result<(), StoreError>;
}
