//! # Perkeep HTTP client
//!
//! Wires the [`BlobStore`] trait to a running Perkeep server.
//!
//! - [`PerkeepClient::connect`] performs server discovery and learns the blob,
//!   search and signing endpoints plus the server's signing key.
//! - Signing is delegated to the server's sign handler, so no private key is
//!   ever handled here.
//! - All transport and protocol failures surface as [`StoreError`]s.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use url::Url;

use crate::config::{Credentials, StoreConfig};
use crate::contract::{Blob, BlobRef, BlobStore, StoreError};

const DISCOVERY_ACCEPT: &str = "text/x-camli-configuration";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Discovery {
    blob_root: String,
    search_root: String,
    signing: Option<SigningDiscovery>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SigningDiscovery {
    public_key_blob_ref: String,
    sign_handler: String,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    blobs: Option<Vec<SearchResultBlob>>,
}

#[derive(Debug, Deserialize)]
struct SearchResultBlob {
    blob: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    received: Vec<ReceivedBlob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceivedBlob {
    blob_ref: String,
}

pub struct PerkeepClient {
    http: Client,
    credentials: Option<Credentials>,
    upload_url: Url,
    query_url: Url,
    sign_url: Url,
    signer: String,
}

impl PerkeepClient {
    /// Discovers the server's endpoints and signing identity.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let http = Client::new();
        let server = &config.server;

        tracing::info!(server = %server, "Discovering Perkeep server configuration");
        let request = with_auth(
            http.get(server.clone()).header(reqwest::header::ACCEPT, DISCOVERY_ACCEPT),
            config.credentials.as_ref(),
        );
        let discovery: Discovery = check(request.send().await?).await?.json().await.map_err(|e| {
            tracing::error!(error = ?e, server = %server, "Discovery response was not understood");
            e
        })?;

        let signing = discovery.signing.ok_or_else(|| -> StoreError {
            tracing::error!(server = %server, "Server has no signing configured");
            format!("server {server} does not offer a signing handler").into()
        })?;

        let blob_root = server.join(&discovery.blob_root)?;
        let search_root = server.join(&discovery.search_root)?;
        let client = PerkeepClient {
            upload_url: blob_root.join("camli/upload")?,
            query_url: search_root.join("camli/search/query")?,
            sign_url: server.join(&signing.sign_handler)?,
            signer: signing.public_key_blob_ref,
            credentials: config.credentials.clone(),
            http,
        };
        tracing::info!(
            upload_url = %client.upload_url,
            query_url = %client.query_url,
            signer = %client.signer,
            "Connected to Perkeep server"
        );
        Ok(client)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        with_auth(builder, self.credentials.as_ref())
    }
}

fn with_auth(builder: RequestBuilder, credentials: Option<&Credentials>) -> RequestBuilder {
    match credentials {
        Some(c) => builder.basic_auth(&c.user, Some(&c.password)),
        None => builder,
    }
}

/// Turns non-2xx responses into errors carrying status and body.
async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    tracing::error!(%status, %url, body = %body, "Perkeep request failed");
    Err(format!("{url} answered {status}: {body}").into())
}

#[async_trait]
impl BlobStore for PerkeepClient {
    async fn query(&self, expression: &str) -> Result<Vec<BlobRef>, StoreError> {
        tracing::debug!(expression, "Querying Perkeep search");
        let request = self
            .request(self.http.post(self.query_url.clone()))
            .json(&json!({ "expression": expression }));
        let result: SearchResult = check(request.send().await?).await?.json().await?;

        result
            .blobs
            .unwrap_or_default()
            .into_iter()
            .map(|b| {
                BlobRef::parse(&b.blob)
                    .ok_or_else(|| -> StoreError { format!("invalid blobref in search result: {}", b.blob).into() })
            })
            .collect()
    }

    async fn sign(&self, mut unsigned: Map<String, Value>) -> Result<Blob, StoreError> {
        unsigned.insert("camliSigner".into(), json!(self.signer));
        let payload = serde_json::to_string(&unsigned)?;

        let request = self
            .request(self.http.post(self.sign_url.clone()))
            .form(&[("json", payload.as_str())]);
        let signed = check(request.send().await?).await?.text().await?;
        tracing::debug!(bytes = signed.len(), "Signed schema blob");
        Ok(Blob::new(signed.into_bytes()))
    }

    async fn put_multi(&self, blobs: Vec<Blob>) -> Result<(), StoreError> {
        if blobs.is_empty() {
            return Ok(());
        }

        let mut expected = HashSet::with_capacity(blobs.len());
        let mut form = multipart::Form::new();
        for blob in blobs {
            let name = blob.blob_ref().to_string();
            let part = multipart::Part::bytes(blob.data().to_vec())
                .file_name(name.clone())
                .mime_str("application/octet-stream")?;
            form = form.part(name.clone(), part);
            expected.insert(name);
        }

        tracing::debug!(count = expected.len(), "Uploading blobs");
        let request = self
            .request(self.http.post(self.upload_url.clone()))
            .multipart(form);
        let response: UploadResponse = check(request.send().await?).await?.json().await?;

        for received in &response.received {
            expected.remove(&received.blob_ref);
        }
        if !expected.is_empty() {
            tracing::error!(missing = ?expected, "Server did not acknowledge all uploaded blobs");
            return Err(format!("server did not receive {} blob(s)", expected.len()).into());
        }
        Ok(())
    }
}
