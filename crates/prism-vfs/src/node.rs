//! Persisted node records.
//!
//! A node is stored as one JSON document under its own path:
//!
//! ```json
//! {
//!   "type": "file",
//!   "content": { "kind": "text", "data": "hello" },
//!   "mimetype": "text/plain",
//!   "created": "2026-01-01T00:00:00Z",
//!   "modified": "2026-01-01T00:00:00Z",
//!   "permissions": ["user"],
//!   "meta": { "hidden": true }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::permissions::PermissionSet;

/// Free-form node metadata (e.g. `hidden`).
pub type Meta = Map<String, Value>;

/// Payload of a file node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum Content {
    /// UTF-8 text.
    Text(String),
    /// Structured data.
    Json(Value),
    /// Raw bytes, base64 in the persisted form.
    Binary(#[serde(with = "base64_bytes")] Vec<u8>),
}

impl Content {
    /// Payload as bytes: text verbatim, JSON re-encoded, binary as-is.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if structured content cannot be encoded.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Text(text) => Ok(text.clone().into_bytes()),
            Self::Json(value) => serde_json::to_vec(value),
            Self::Binary(bytes) => Ok(bytes.clone()),
        }
    }

    /// Text view of the payload, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Size of the payload in bytes, as [`Content::to_bytes`] would produce.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Json(value) => value.to_string().len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<&[u8]> for Content {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(bytes.to_vec())
    }
}

/// Kind-specific part of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeBody {
    /// Directory: ordered paths of direct children.
    Dir {
        /// Child paths, each present at most once.
        content: Vec<String>,
    },
    /// File: payload plus sniffed mimetype.
    File {
        /// File payload.
        content: Content,
        /// Mimetype derived from the payload.
        mimetype: String,
    },
}

/// A file or directory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Directory or file specifics.
    #[serde(flatten)]
    pub body: NodeBody,
    /// Creation time; survives overwrites.
    pub created: DateTime<Utc>,
    /// Last mutation time.
    pub modified: DateTime<Utc>,
    /// Tags a caller must overlap with.
    #[serde(default)]
    pub permissions: PermissionSet,
    /// Extra metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Meta,
}

impl Node {
    /// A fresh, empty directory.
    #[must_use]
    pub fn dir(permissions: PermissionSet, meta: Meta) -> Self {
        let now = Utc::now();
        Self {
            body: NodeBody::Dir {
                content: Vec::new(),
            },
            created: now,
            modified: now,
            permissions,
            meta,
        }
    }

    /// Whether this is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        matches!(self.body, NodeBody::Dir { .. })
    }

    /// Whether this is a file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self.body, NodeBody::File { .. })
    }

    /// `"dir"` or `"file"`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self.body {
            NodeBody::Dir { .. } => "dir",
            NodeBody::File { .. } => "file",
        }
    }

    /// Child paths of a directory.
    #[must_use]
    pub fn children(&self) -> Option<&[String]> {
        match &self.body {
            NodeBody::Dir { content } => Some(content),
            NodeBody::File { .. } => None,
        }
    }

    /// Payload of a file.
    #[must_use]
    pub fn content(&self) -> Option<&Content> {
        match &self.body {
            NodeBody::File { content, .. } => Some(content),
            NodeBody::Dir { .. } => None,
        }
    }

    /// Mimetype of a file.
    #[must_use]
    pub fn mimetype(&self) -> Option<&str> {
        match &self.body {
            NodeBody::File { mimetype, .. } => Some(mimetype),
            NodeBody::Dir { .. } => None,
        }
    }

    /// Whether `meta.hidden` is `true`.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        is_hidden(&self.meta)
    }

    /// Link `child` into a directory. Returns `false` if already present or
    /// if this node is not a directory.
    pub(crate) fn link(&mut self, child: &str) -> bool {
        match &mut self.body {
            NodeBody::Dir { content } if !content.iter().any(|c| c == child) => {
                content.push(child.to_owned());
                true
            },
            _ => false,
        }
    }

    /// Unlink `child` from a directory. Returns `true` if it was listed.
    pub(crate) fn unlink(&mut self, child: &str) -> bool {
        match &mut self.body {
            NodeBody::Dir { content } => {
                let before = content.len();
                content.retain(|c| c != child);
                content.len() != before
            },
            NodeBody::File { .. } => false,
        }
    }

    /// Copy of this node with the payload stripped (file info queries).
    #[must_use]
    pub fn without_content(&self) -> Self {
        let mut info = self.clone();
        if let NodeBody::File { content, .. } = &mut info.body {
            *content = Content::Text(String::new());
        }
        info
    }
}

/// Whether a metadata map marks its owner hidden.
#[must_use]
pub fn is_hidden(meta: &Meta) -> bool {
    meta.get("hidden").and_then(Value::as_bool).unwrap_or(false)
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(de)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content: Content) -> Node {
        let now = Utc::now();
        Node {
            body: NodeBody::File {
                content,
                mimetype: "text/plain".into(),
            },
            created: now,
            modified: now,
            permissions: PermissionSet::user(),
            meta: Meta::new(),
        }
    }

    #[test]
    fn test_file_json_shape() {
        let node = file(Content::from("hi"));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["content"]["kind"], "text");
        assert_eq!(json["content"]["data"], "hi");
        assert_eq!(json["permissions"], serde_json::json!(["user"]));
        assert!(json.get("meta").is_none());
    }

    #[test]
    fn test_binary_is_base64_and_decodes() {
        let node = file(Content::from(vec![0x89, b'P', b'N', b'G']));
        let raw = serde_json::to_string(&node).unwrap();
        assert!(raw.contains("iVBORw=="));
        let back: Node = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_dir_link_is_idempotent() {
        let mut dir = Node::dir(PermissionSet::user(), Meta::new());
        assert!(dir.link("/a/b"));
        assert!(!dir.link("/a/b"));
        assert_eq!(dir.children().unwrap(), ["/a/b".to_string()]);
        assert!(dir.unlink("/a/b"));
        assert!(!dir.unlink("/a/b"));
    }

    #[test]
    fn test_missing_permissions_default_to_public() {
        let raw = r#"{"type":"dir","content":[],"created":"2026-01-01T00:00:00Z","modified":"2026-01-01T00:00:00Z"}"#;
        let node: Node = serde_json::from_str(raw).unwrap();
        assert!(node.is_dir());
        assert!(node.permissions.is_public());
    }

    #[test]
    fn test_hidden_meta() {
        let mut node = file(Content::from("x"));
        assert!(!node.is_hidden());
        node.meta.insert("hidden".into(), Value::Bool(true));
        assert!(node.is_hidden());
    }

    #[test]
    fn test_without_content_keeps_mimetype() {
        let node = file(Content::from("secret"));
        let info = node.without_content();
        assert_eq!(info.mimetype(), Some("text/plain"));
        assert!(info.content().unwrap().is_empty());
    }
}
