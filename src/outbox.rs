//! An actor's outbox, resolved from a [`DocumentSet`].

use serde_json::Value;
use tracing::{debug, warn};

use crate::documents::DocumentSet;
use crate::error::ApError;
use crate::jsonld::{
    as_node_list, has_type, resolve_collection_members, resolve_field, resolve_str, COLLECTION,
    ORDERED_COLLECTION,
};

/// The members of one actor's outbox collection, borrowed from the set.
#[derive(Debug)]
pub struct OutboxView<'a> {
    actor: &'a Value,
    members: &'a [Value],
}

impl<'a> OutboxView<'a> {
    /// Resolves `actor_id` and its outbox inside `documents`.
    ///
    /// Fails with [`ApError::MissingData`] when the actor, its `outbox` field or
    /// the outbox node cannot be found. An outbox node that is not a
    /// recognized collection type is accepted and iterates as empty.
    pub fn new(documents: &'a DocumentSet, actor_id: &str) -> Result<Self, ApError> {
        let actor = documents
            .find_by_id(actor_id)
            .ok_or_else(|| ApError::missing(format!("Could not find actor with id {actor_id}")))?;

        let outbox_ref = resolve_field(actor, "outbox")
            .ok_or_else(|| ApError::missing(format!("Actor {actor_id} has no outbox")))?;
        // The outbox is normally a bare IRI, but an embedded node still names itself.
        let outbox_id = outbox_ref
            .as_str()
            .or_else(|| resolve_str(outbox_ref, "id"))
            .ok_or_else(|| ApError::missing(format!("Actor {actor_id} has no outbox id")))?;

        let outbox = documents.find_by_id(outbox_id).ok_or_else(|| {
            ApError::missing(format!("Outbox with id {outbox_id} was not found"))
        })?;

        let members = match resolve_collection_members(outbox) {
            Some(members) => as_node_list(members),
            None if has_type(outbox, COLLECTION) || has_type(outbox, ORDERED_COLLECTION) => {
                return Err(ApError::missing(format!(
                    "Outbox {outbox_id} has no member list"
                )));
            }
            None => {
                warn!(
                    outbox = outbox_id,
                    kind = ?resolve_field(outbox, "type"),
                    "Outbox is not a collection, treating it as empty"
                );
                &[]
            }
        };

        debug!(actor = actor_id, outbox = outbox_id, members = members.len(), "Resolved outbox");
        Ok(Self { actor, members })
    }

    pub fn actor(&self) -> &'a Value {
        self.actor
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Every member in stored order, unfiltered.
    pub fn iter(&self) -> std::slice::Iter<'a, Value> {
        let members: &'a [Value] = self.members;
        members.iter()
    }

    /// Only the `Create` activities whose `object` is a `Note`.
    ///
    /// Each call is a fresh pass over the collection.
    pub fn notes_only(&self) -> impl Iterator<Item = &'a Value> + 'a {
        let members: &'a [Value] = self.members;
        members.iter().filter(|member| is_note_creation(member))
    }
}

impl<'a> IntoIterator for &OutboxView<'a> {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A `Create` activity with an embedded `Note` object.
pub fn is_note_creation(activity: &Value) -> bool {
    has_type(activity, "Create")
        && resolve_field(activity, "object").is_some_and(|object| has_type(object, "Note"))
}
