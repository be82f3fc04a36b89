use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::models::{Kind, ObjectKey, Resource};

pub const END_SUFFIX: &str = "\u{ffff}";

/// Document id of an object: `<kind>:<namespace>:<name>`.
pub fn doc_id(kind: Kind, key: &ObjectKey) -> String {
    format!("{}:{}:{}", kind.as_str(), key.namespace, key.name)
}

/// Id prefix covering every object of `kind`, optionally in one namespace.
pub fn doc_prefix(kind: Kind, namespace: Option<&str>) -> String {
    match namespace {
        Some(namespace) => format!("{}:{}:", kind.as_str(), namespace),
        None => format!("{}:", kind.as_str()),
    }
}

/// Recover the kind encoded in a document id.
pub fn doc_kind(doc_id: &str) -> Option<Kind> {
    let (kind, rest) = doc_id.split_once(':')?;
    if !rest.contains(':') {
        return None;
    }
    match kind {
        "game" => Some(Kind::Game),
        "guess" => Some(Kind::Guess),
        "phrase" => Some(Kind::Phrase),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct PutResponse {
    pub rev: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangesResponse {
    #[serde(default)]
    pub results: Vec<ChangeRow>,
    /// A string on CouchDB 2+, a number on 1.x.
    pub last_seq: Value,
}

impl ChangesResponse {
    /// Sequence token to resume the feed from.
    pub fn resume_token(&self) -> String {
        match &self.last_seq {
            Value::String(seq) => seq.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangeRow {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub changes: Vec<ChangeRev>,
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRev {
    pub rev: String,
}

/// Stored representation of an object. The CouchDB `_rev` doubles as the
/// object's resource version, so the body never persists one itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchDocument<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Tombstones keep their body so the changes feed can still describe them.
    #[serde(rename = "_deleted", default, skip_serializing_if = "is_false")]
    pub deleted: bool,
    #[serde(flatten)]
    pub body: T,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl<T: Resource> CouchDocument<T> {
    pub fn from_resource(mut object: T, rev: Option<String>) -> Self {
        let id = doc_id(T::KIND, &object.metadata().key());
        object.metadata_mut().resource_version = None;
        Self {
            id,
            rev,
            deleted: false,
            body: object,
        }
    }

    pub fn tombstone(object: T, rev: Option<String>) -> Self {
        Self {
            deleted: true,
            ..Self::from_resource(object, rev)
        }
    }

    pub fn into_resource(self) -> T {
        let mut object = self.body;
        object.metadata_mut().resource_version = self.rev;
        object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::Game;

    #[test]
    fn doc_ids_round_trip_kind() {
        let id = doc_id(Kind::Guess, &ObjectKey::new("default", "g-1"));
        assert_eq!(id, "guess:default:g-1");
        assert_eq!(doc_kind(&id), Some(Kind::Guess));
        assert_eq!(doc_kind("_design/views"), None);
        assert_eq!(doc_kind("game:only-namespace"), None);
    }

    #[test]
    fn document_carries_revision_outside_body() {
        let mut game = Game::new("default", "g1");
        game.metadata.resource_version = Some("stale".into());

        let doc = CouchDocument::from_resource(game, Some("2-abc".into()));
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["_id"], "game:default:g1");
        assert_eq!(value["_rev"], "2-abc");
        assert!(value.get("_deleted").is_none());
        assert!(value["metadata"]["resource_version"].is_null());

        let back: CouchDocument<Game> = serde_json::from_value(value).unwrap();
        assert_eq!(
            back.into_resource().metadata.resource_version.as_deref(),
            Some("2-abc")
        );
    }

    #[test]
    fn tombstone_keeps_body() {
        let doc = CouchDocument::tombstone(Game::new("default", "g1"), Some("3-x".into()));
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["_deleted"], true);
        assert_eq!(value["metadata"]["name"], "g1");
    }
}
