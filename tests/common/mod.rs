#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use apkeep::contract::{Blob, BlobRef, BlobStore, StoreError};
use apkeep::documents::DocumentSet;
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Archive fixtures shipped next to the tests.
pub fn testdata_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/testdata")
}

pub fn load_testdata() -> DocumentSet {
    DocumentSet::load_from_dir(Some(&testdata_dir()))
}

/// Custom Layer to collect emitted events.
pub struct EventCollector {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

/// Runs `f` with an [`EventCollector`] installed and returns its events.
pub fn collect_events<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = Registry::default().with(EventCollector {
        events: events.clone(),
    });
    let result = {
        let _guard = tracing::subscriber::set_default(subscriber);
        f()
    };
    let collected = events.lock().unwrap().clone();
    (result, collected)
}

/// In-memory blob store that understands claims well enough to answer
/// `attr:<name>:"<value>"` queries.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<Vec<Blob>>,
    put_calls: Mutex<usize>,
    sign_calls: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn put_calls(&self) -> usize {
        *self.put_calls.lock().unwrap()
    }

    pub fn sign_calls(&self) -> usize {
        *self.sign_calls.lock().unwrap()
    }

    pub fn get(&self, blob_ref: &BlobRef) -> Option<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.blob_ref() == blob_ref)
            .map(|b| b.data().to_vec())
    }

    /// Parsed schema blobs of the given camliType, in upload order.
    pub fn schema_blobs(&self, camli_type: &str) -> Vec<Map<String, Value>> {
        self.blobs
            .lock()
            .unwrap()
            .iter()
            .filter_map(|b| serde_json::from_slice::<Map<String, Value>>(b.data()).ok())
            .filter(|m| m.get("camliType").and_then(Value::as_str) == Some(camli_type))
            .collect()
    }

    /// `(attribute, claimType, value)` of every claim on `permanode`, in upload order.
    pub fn claims_for(&self, permanode: &BlobRef) -> Vec<(String, String, String)> {
        self.schema_blobs("claim")
            .into_iter()
            .filter(|c| c["permaNode"] == json!(permanode.as_str()))
            .map(|c| {
                (
                    c["attribute"].as_str().unwrap().to_string(),
                    c["claimType"].as_str().unwrap().to_string(),
                    c["value"].as_str().unwrap().to_string(),
                )
            })
            .collect()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn query(&self, expression: &str) -> Result<Vec<BlobRef>, StoreError> {
        let re = Regex::new(r#"^attr:([^:]+):"(.*)"$"#).unwrap();
        let caps = re
            .captures(expression)
            .ok_or_else(|| -> StoreError { format!("unsupported query {expression}").into() })?;
        let attribute = &caps[1];
        let value = caps[2].replace("\\\"", "\"").replace("\\\\", "\\");

        let mut found: Vec<BlobRef> = Vec::new();
        for claim in self.schema_blobs("claim") {
            if claim["attribute"] == json!(attribute) && claim["value"] == json!(value) {
                let permanode = BlobRef::parse(claim["permaNode"].as_str().unwrap()).unwrap();
                if !found.contains(&permanode) {
                    found.push(permanode);
                }
            }
        }
        Ok(found)
    }

    async fn sign(&self, mut unsigned: Map<String, Value>) -> Result<Blob, StoreError> {
        *self.sign_calls.lock().unwrap() += 1;
        unsigned.insert("camliSigner".into(), json!("sha224-00"));
        unsigned.insert("camliSig".into(), json!("test-signature"));
        Ok(Blob::from_json(&unsigned)?)
    }

    async fn put_multi(&self, blobs: Vec<Blob>) -> Result<(), StoreError> {
        *self.put_calls.lock().unwrap() += 1;
        self.blobs.lock().unwrap().extend(blobs);
        Ok(())
    }
}
