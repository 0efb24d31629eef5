//! Perkeep schema blobs: permanodes, attribute claims and files.
//!
//! Every map built here starts with `camliVersion`, which the store uses to
//! recognize schema blobs. Signing is left to [`crate::contract::BlobStore::sign`].

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::contract::{Blob, BlobRef};

/// Size of the parts attachment bytes are split into.
pub const CHUNK_SIZE: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOp {
    Set,
    Add,
}

impl ClaimOp {
    pub fn claim_type(self) -> &'static str {
        match self {
            ClaimOp::Set => "set-attribute",
            ClaimOp::Add => "add-attribute",
        }
    }
}

/// One attribute mutation to apply to a permanode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub attribute: String,
    pub op: ClaimOp,
    pub value: String,
}

impl Claim {
    pub fn set(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            op: ClaimOp::Set,
            value: value.into(),
        }
    }

    pub fn add(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            op: ClaimOp::Add,
            value: value.into(),
        }
    }
}

fn schema_map(camli_type: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("camliVersion".into(), json!(1));
    map.insert("camliType".into(), json!(camli_type));
    map
}

/// Unsigned permanode; `random` makes each one unique.
pub fn permanode(random: &str) -> Map<String, Value> {
    let mut map = schema_map("permanode");
    map.insert("random".into(), json!(random));
    map
}

/// Unsigned claim against `permanode`, dated `claim_date`.
pub fn claim(permanode: &BlobRef, claim: &Claim, claim_date: DateTime<Utc>) -> Map<String, Value> {
    let mut map = schema_map("claim");
    map.insert("permaNode".into(), json!(permanode.as_str()));
    map.insert("claimType".into(), json!(claim.op.claim_type()));
    map.insert("attribute".into(), json!(claim.attribute));
    map.insert("value".into(), json!(claim.value));
    map.insert(
        "claimDate".into(),
        json!(claim_date.to_rfc3339_opts(SecondsFormat::Nanos, true)),
    );
    map
}

/// Chunks `data` and builds the file schema blob describing it.
///
/// Returns the file blob and its parts; the file blob's ref is the one to
/// reference from claims.
pub fn file(file_name: &str, data: &[u8]) -> Result<(Blob, Vec<Blob>), serde_json::Error> {
    let chunks: Vec<Blob> = data
        .chunks(CHUNK_SIZE)
        .map(|chunk| Blob::new(chunk.to_vec()))
        .collect();
    let parts: Vec<Value> = chunks
        .iter()
        .map(|chunk| json!({"blobRef": chunk.blob_ref().as_str(), "size": chunk.len()}))
        .collect();

    let mut map = schema_map("file");
    map.insert("fileName".into(), json!(file_name));
    map.insert("parts".into(), Value::Array(parts));
    Ok((Blob::from_json(&map)?, chunks))
}
