//! Window chrome protocol.
//!
//! Applications describe the controls they want in their window's top bar
//! with small JSON requests:
//!
//! ```json
//! { "verb": "add", "name": "save", "position": "right",
//!   "item": { "type": "button", "id": "save", "text": "Save", "callback": "onSave" } }
//! { "verb": "update", "name": "title", "item": { "type": "title", "text": "Draft" } }
//! { "verb": "remove", "name": "save" }
//! ```
//!
//! Malformed items are rejected with a [`TopbarError`]. Unknown verbs are
//! logged and ignored. The resulting element list is published on a watch
//! channel for the host to render.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::TopbarError;
use crate::process::ProcessId;

/// Where an element sits in the bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChromePosition {
    /// Leading edge.
    #[default]
    Left,
    /// Middle.
    Center,
    /// Trailing edge.
    Right,
}

/// A chrome control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChromeItem {
    /// Window title.
    Title {
        /// Title text.
        text: String,
    },
    /// The close control.
    Close,
    /// A labeled button.
    Button {
        /// Element id inside the application document.
        id: String,
        /// Label.
        text: String,
        /// Name of the application function to call on click.
        callback: String,
    },
    /// Static text.
    Text {
        /// The text.
        text: String,
    },
}

impl ChromeItem {
    /// Validate a wire item.
    ///
    /// # Errors
    ///
    /// Returns [`TopbarError`] for an unknown type or a missing required field.
    pub fn from_value(value: &Value) -> Result<Self, TopbarError> {
        let obj = value
            .as_object()
            .ok_or_else(|| TopbarError::Malformed("item must be an object".into()))?;
        let kind = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| TopbarError::Malformed("item has no type".into()))?;

        let field = |name: &'static str| -> Result<String, TopbarError> {
            obj.get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .ok_or_else(|| TopbarError::MissingField {
                    item: kind.to_owned(),
                    field: name,
                })
        };

        match kind {
            "title" => Ok(Self::Title {
                text: field("text")?,
            }),
            "close" => Ok(Self::Close),
            "button" => Ok(Self::Button {
                callback: field("callback")?,
                id: field("id")?,
                text: field("text")?,
            }),
            "text" => Ok(Self::Text {
                text: field("text")?,
            }),
            other => Err(TopbarError::UnknownItem(other.to_owned())),
        }
    }
}

/// A named control at a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChromeElement {
    /// Name used by `remove`/`update`.
    pub name: String,
    /// Position in the bar.
    pub position: ChromePosition,
    /// The control.
    pub item: ChromeItem,
}

/// One process's window chrome.
#[derive(Debug)]
pub struct Topbar {
    process_id: ProcessId,
    elements: watch::Sender<Vec<ChromeElement>>,
}

impl Topbar {
    pub(crate) fn new(process_id: ProcessId) -> Self {
        let (elements, _) = watch::channel(Vec::new());
        Self {
            process_id,
            elements,
        }
    }

    /// Apply a JSON request.
    ///
    /// # Errors
    ///
    /// Returns [`TopbarError`] if the request or its item is invalid.
    pub fn handle(&self, request: &Value) -> Result<(), TopbarError> {
        let verb = request
            .get("verb")
            .and_then(Value::as_str)
            .ok_or_else(|| TopbarError::Malformed("request has no verb".into()))?;
        let name = || {
            request
                .get("name")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| TopbarError::Malformed(format!("'{verb}' needs a name")))
        };
        let position = || -> Result<Option<ChromePosition>, TopbarError> {
            request
                .get("position")
                .map(|p| {
                    serde_json::from_value(p.clone())
                        .map_err(|e| TopbarError::Malformed(format!("position: {e}")))
                })
                .transpose()
        };
        let item = || {
            request
                .get("item")
                .ok_or_else(|| TopbarError::Malformed(format!("'{verb}' needs an item")))
                .and_then(ChromeItem::from_value)
        };

        match verb {
            "add" => self.add(name()?, position()?.unwrap_or_default(), item()?),
            "update" => self.update(name()?, position()?, item()?),
            "remove" => {
                self.remove(name()?);
                Ok(())
            },
            other => {
                warn!(process_id = %self.process_id, verb = %other, "Unknown chrome verb ignored");
                Ok(())
            },
        }
    }

    /// Add a new element.
    ///
    /// # Errors
    ///
    /// Returns [`TopbarError::Duplicate`] if `name` is taken.
    pub fn add(&self, name: &str, position: ChromePosition, item: ChromeItem) -> Result<(), TopbarError> {
        let mut result = Ok(());
        self.elements.send_if_modified(|elements| {
            if elements.iter().any(|e| e.name == name) {
                result = Err(TopbarError::Duplicate(name.to_owned()));
                return false;
            }
            elements.push(ChromeElement {
                name: name.to_owned(),
                position,
                item,
            });
            true
        });
        if result.is_ok() {
            debug!(process_id = %self.process_id, name = %name, "Chrome element added");
        }
        result
    }

    /// Replace an element's item, and its position if given.
    ///
    /// # Errors
    ///
    /// Returns [`TopbarError::UnknownElement`] if `name` is not present.
    pub fn update(
        &self,
        name: &str,
        position: Option<ChromePosition>,
        item: ChromeItem,
    ) -> Result<(), TopbarError> {
        let mut found = false;
        self.elements.send_if_modified(|elements| {
            if let Some(element) = elements.iter_mut().find(|e| e.name == name) {
                element.item = item;
                if let Some(position) = position {
                    element.position = position;
                }
                found = true;
            }
            found
        });
        if found {
            Ok(())
        } else {
            Err(TopbarError::UnknownElement(name.to_owned()))
        }
    }

    /// Remove an element. Returns `false` (with a warning) if absent.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.elements.send_if_modified(|elements| {
            let before = elements.len();
            elements.retain(|e| e.name != name);
            elements.len() != before
        });
        if !removed {
            warn!(process_id = %self.process_id, name = %name, "No chrome element to remove");
        }
        removed
    }

    /// Current elements, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChromeElement> {
        self.elements.borrow().clone()
    }

    /// Receive every change to the element list.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<ChromeElement>> {
        self.elements.subscribe()
    }
}
