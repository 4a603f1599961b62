//! Application manifest (`manifest.json`).
//!
//! ```json
//! { "id": "com.example.notes", "hidden": false }
//! ```
//!
//! `id` is the application's global identity. It namespaces the app's
//! private storage, so two bundles declaring the same id share storage.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CapsuleError, CapsuleResult};

/// Parsed `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Global application identity.
    #[serde(rename = "id", alias = "globalID", default)]
    pub global_id: String,

    /// Keep the app out of listings and search.
    #[serde(default)]
    pub hidden: bool,

    /// Presentation hints and anything else the manifest declares.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    /// Parse and validate manifest bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::ManifestInvalid`] if the bytes are not a JSON
    /// object or the id is empty or not a single path segment.
    pub fn parse(raw: &[u8]) -> CapsuleResult<Self> {
        let manifest: Self = serde_json::from_slice(raw)
            .map_err(|e| CapsuleError::ManifestInvalid(format!("manifest.json: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check the id.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::ManifestInvalid`] on an empty id or one that
    /// could not be used as a storage directory name.
    pub fn validate(&self) -> CapsuleResult<()> {
        let id = self.global_id.trim();
        if id.is_empty() {
            return Err(CapsuleError::ManifestInvalid(
                "manifest.json does not declare an id".into(),
            ));
        }
        if id != self.global_id
            || id == "."
            || id == ".."
            || id.contains(['/', '\0'])
        {
            return Err(CapsuleError::ManifestInvalid(format!(
                "'{}' is not a usable application id",
                self.global_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let m = Manifest::parse(br#"{"id":"notes"}"#).unwrap();
        assert_eq!(m.global_id, "notes");
        assert!(!m.hidden);
        assert!(m.extra.is_empty());
    }

    #[test]
    fn test_parse_keeps_extra_hints() {
        let m = Manifest::parse(br#"{"id":"calc","hidden":true,"icon":"calc.svg"}"#).unwrap();
        assert!(m.hidden);
        assert_eq!(m.extra["icon"], "calc.svg");
    }

    #[test]
    fn test_global_id_alias() {
        let m = Manifest::parse(br#"{"globalID":"x"}"#).unwrap();
        assert_eq!(m.global_id, "x");
    }

    #[test]
    fn test_missing_or_empty_id_rejected() {
        assert!(matches!(
            Manifest::parse(br#"{"hidden":true}"#),
            Err(CapsuleError::ManifestInvalid(_))
        ));
        assert!(Manifest::parse(br#"{"id":""}"#).is_err());
        assert!(Manifest::parse(br#"{"id":"   "}"#).is_err());
    }

    #[test]
    fn test_unusable_id_rejected() {
        assert!(Manifest::parse(br#"{"id":"a/b"}"#).is_err());
        assert!(Manifest::parse(br#"{"id":".."}"#).is_err());
    }

    #[test]
    fn test_not_json_rejected() {
        assert!(Manifest::parse(b"not json").is_err());
        assert!(Manifest::parse(b"[]").is_err());
    }
}
