use std::path::PathBuf;

use crate::error::Result;
use crate::selector::By;

/// Opaque reference to an element owned by the remote session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// The primitives the login flow needs from a remote device session.
///
/// `find_by` returns `Ok(None)` when nothing matches; `Err` is reserved for
/// the server itself misbehaving. `click` and `send_text` report success as a
/// plain bool so callers decide whether a failed interaction matters.
pub trait DeviceSession {
    fn find_by(&self, by: By, query: &str) -> Result<Option<ElementHandle>>;
    fn click(&self, element: &ElementHandle) -> bool;
    /// Clears the element, then types `text` into it.
    fn send_text(&self, element: &ElementHandle, text: &str) -> bool;
    fn element_text(&self, element: &ElementHandle) -> Option<String>;
    /// Captures the screen and stores it under `label`, returning where it went.
    fn screenshot(&self, label: &str) -> Result<PathBuf>;
    fn quit(&self);
}
