//! Publishing of note activities into the blob store.
//!
//! Each activity becomes one permanode carrying a fixed sequence of claims:
//!
//! | attribute               | op  | value                                  |
//! |-------------------------|-----|----------------------------------------|
//! | `camliType`             | set | [`NOTE_CAMLI_TYPE`]                    |
//! | `camliPath:object`      | add | ref of the serialized activity         |
//! | `asId`                  | set | activity id                            |
//! | `asObjectId`            | set | note id                                |
//! | `asActor`               | set | activity actor                         |
//! | `camliPath:object`      | set | ref of the serialized activity         |
//! | `content`               | set | note HTML, with an optional summary    |
//! | `startDate`             | set | activity `published`                   |
//! | `camliPath:attachmentN` | set | file ref of the N-th attachment        |
//!
//! Activities already published (an `asId` claim exists) are skipped, which
//! makes re-running over the same archive safe. Attachments are uploaded on
//! their own before the record's batch; the batch is the point past which the
//! record counts as published.
//!
//! Processing is strictly sequential and the existence check is not a lock:
//! two concurrent runs over one archive may both publish an activity.

use std::path::{Component, Path, PathBuf};

use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::{debug, info};

use crate::contract::{Blob, BlobRef, BlobStore};
use crate::error::ApError;
use crate::jsonld::{as_node_list, resolve_field};
use crate::schema::{self, Claim};

/// `camliType` attribute value of published notes.
pub const NOTE_CAMLI_TYPE: &str = "ActivityStreams:Create:Note";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Created { permanode: BlobRef },
    AlreadyExists,
}

/// Counts of one [`Publisher::publish_all`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    pub added: usize,
    pub skipped: usize,
}

/// Everything a record needs from its activity, extracted before any remote call.
#[derive(Debug)]
struct NoteRecord<'a> {
    as_id: &'a str,
    object_id: &'a str,
    actor: String,
    content: String,
    published: String,
    attachment_urls: Vec<&'a str>,
}

impl<'a> NoteRecord<'a> {
    fn extract(activity: &'a Value) -> Result<Self, ApError> {
        let as_id = resolve_field(activity, "id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApError::missing("Item has no id"))?;
        let missing = |field: &str| ApError::missing(format!("{as_id}: activity has no {field}"));

        let object = resolve_required(activity, "object").ok_or_else(|| missing("object"))?;
        let object_id = resolve_field(object, "id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| missing("object id"))?;
        let actor = resolve_required(activity, "actor")
            .map(claim_text)
            .ok_or_else(|| missing("actor"))?;
        let html = resolve_required(object, "content")
            .map(claim_text)
            .ok_or_else(|| missing("object content"))?;
        let content = match resolve_field(object, "summary").and_then(Value::as_str) {
            Some(summary) if !summary.is_empty() => {
                format!(r#"<p class="summary">{summary}</p>{html}"#)
            }
            _ => html,
        };
        let published = resolve_required(activity, "published")
            .map(claim_text)
            .ok_or_else(|| missing("published date"))?;

        let attachment_urls = resolve_field(object, "attachment")
            .map(as_node_list)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(n, attachment)| {
                resolve_field(attachment, "url")
                    .and_then(Value::as_str)
                    .ok_or_else(|| missing(&format!("url for attachment {n}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            as_id,
            object_id,
            actor,
            content,
            published,
            attachment_urls,
        })
    }
}

/// Like [`resolve_field`], but an explicit `null` counts as absent.
fn resolve_required<'v>(node: &'v Value, field: &str) -> Option<&'v Value> {
    resolve_field(node, field).filter(|value| !value.is_null())
}

/// Strings are used verbatim, anything else as compact JSON.
fn claim_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Search expression matching permanodes whose `attr` equals `value`.
pub fn attr_query(attr: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!(r#"attr:{attr}:"{escaped}""#)
}

/// Maps an archive attachment URL to a file under `archive_root`.
///
/// Archive URLs are rooted at the archive: the URL is percent-decoded and
/// leading `/` are dropped rather than treated as filesystem-absolute. A path
/// that would leave the archive (`..`, a root or a drive prefix) is rejected.
pub fn resolve_attachment_path(archive_root: &Path, url: &str) -> Result<PathBuf, ApError> {
    let decoded = urlencoding::decode(url)
        .map_err(|e| ApError::AttachmentUrl(format!("{url}: {e}")))?;
    let relative = Path::new(decoded.trim_start_matches('/'));
    if relative.as_os_str().is_empty() {
        return Err(ApError::AttachmentUrl(url.to_string()));
    }
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(ApError::AttachmentUrl(format!(
            "{url}: points outside the archive"
        )));
    }
    Ok(archive_root.join(relative))
}

/// Publishes activities into a [`BlobStore`], resolving attachments under an archive root.
pub struct Publisher<'s, S: BlobStore> {
    store: &'s S,
    archive_root: PathBuf,
}

impl<'s, S: BlobStore> Publisher<'s, S> {
    pub fn new(store: &'s S, archive_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            archive_root: archive_root.into(),
        }
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    /// Publishes every activity in order and returns the counts.
    ///
    /// The first failure ends the batch; activities published before it stay published.
    pub async fn publish_all<'v, I>(&self, activities: I) -> Result<PublishReport, ApError>
    where
        I: IntoIterator<Item = &'v Value>,
    {
        let mut report = PublishReport::default();

        for activity in activities {
            match self.publish_one(activity).await {
                Ok(PublishOutcome::Created { .. }) => report.added += 1,
                Ok(PublishOutcome::AlreadyExists) => report.skipped += 1,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        added = report.added,
                        skipped = report.skipped,
                        "Publishing aborted"
                    );
                    return Err(e);
                }
            }
        }

        info!(
            added = report.added,
            skipped = report.skipped,
            "Done processing. Added {} new entries, skipped {} entries.",
            report.added,
            report.skipped
        );
        Ok(report)
    }

    /// Publishes one `Create`/`Note` activity unless it was published before.
    ///
    /// Missing required fields fail with [`ApError::MissingData`] before any
    /// store call. An unreadable attachment fails the activity.
    pub async fn publish_one(&self, activity: &Value) -> Result<PublishOutcome, ApError> {
        let record = NoteRecord::extract(activity)?;
        let as_id = record.as_id;

        let existing = self.store.query(&attr_query("asId", as_id)).await?;
        if !existing.is_empty() {
            info!(as_id, "Already exists");
            return Ok(PublishOutcome::AlreadyExists);
        }

        let permanode = self
            .store
            .sign(schema::permanode(&uuid::Uuid::new_v4().to_string()))
            .await?;
        let object = Blob::new(serde_json::to_vec(activity)?);
        let object_ref = object.blob_ref().to_string();

        let mut claims = vec![
            Claim::set("camliType", NOTE_CAMLI_TYPE),
            Claim::add("camliPath:object", object_ref.clone()),
            Claim::set("asId", as_id),
            Claim::set("asObjectId", record.object_id),
            Claim::set("asActor", record.actor.clone()),
            Claim::set("camliPath:object", object_ref),
            Claim::set("content", record.content.clone()),
            Claim::set("startDate", record.published.clone()),
        ];

        for (n, url) in record.attachment_urls.iter().enumerate() {
            let file_ref = self.upload_attachment(url).await?;
            debug!(as_id, attachment = n, url, file = %file_ref, "Put attachment");
            claims.push(Claim::set(format!("camliPath:attachment{n}"), file_ref.to_string()));
        }

        // Claims are dated apart so the store applies them in this order.
        let base_date = Utc::now();
        let mut blobs = Vec::with_capacity(claims.len() + 2);
        blobs.push(permanode.clone());
        blobs.push(object);
        for (i, claim) in claims.iter().enumerate() {
            let claim_date = base_date + Duration::milliseconds(i as i64);
            let unsigned = schema::claim(permanode.blob_ref(), claim, claim_date);
            blobs.push(self.store.sign(unsigned).await?);
        }

        self.store.put_multi(blobs).await?;
        info!(as_id, permanode = %permanode.blob_ref(), "New permanode");

        Ok(PublishOutcome::Created {
            permanode: permanode.blob_ref().clone(),
        })
    }

    /// Uploads one attachment file on its own and returns its file ref.
    async fn upload_attachment(&self, url: &str) -> Result<BlobRef, ApError> {
        let path = resolve_attachment_path(&self.archive_root, url)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|source| ApError::Attachment {
                path: path.clone(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (file, mut parts) = schema::file(&file_name, &data)?;
        let file_ref = file.blob_ref().clone();
        parts.push(file);
        self.store.put_multi(parts).await?;
        Ok(file_ref)
    }
}
