//! # Canonical JSON — Key-Sorted Text for Identity Comparisons
//!
//! Problem states from different producers describe the same subject with
//! objects whose keys arrive in arbitrary order. Grouping them requires a
//! rendering where `{"projectId":"P0","groupId":"G0"}` and
//! `{"groupId":"G0","projectId":"P0"}` are the same string.
//!
//! [`CanonicalBytes`] is that rendering: RFC 8785 output from `serde_jcs`,
//! with keys ordered by UTF-16 code unit and no insignificant whitespace.
//! Floats are permitted because subject refs are opaque caller data.

use serde::Serialize;

use crate::error::CanonicalizationError;

/// Key-sorted compact JSON. Only [`CanonicalBytes::new()`] builds one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(String);

impl CanonicalBytes {
    /// Render `obj` canonically.
    ///
    /// # Errors
    ///
    /// [`CanonicalizationError::SerializationFailed`] when `obj` has no JSON
    /// representation (for example a map with non-string keys).
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        serde_jcs::to_string(obj).map(Self).map_err(Into::into)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the underlying text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Canonical text of `obj`, for use as one component of a composite key.
pub fn canonical_string(obj: &impl Serialize) -> Result<String, CanonicalizationError> {
    CanonicalBytes::new(obj).map(CanonicalBytes::into_string)
}
