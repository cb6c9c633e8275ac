//! Request correlation tokens.
//!
//! A `RequestId` links a command request to its eventual response. The wire
//! form is the string form of a UUID; frames sent without an explicit id
//! carry the all-zero sentinel.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The all-zero sentinel stamped on frames sent without a request id.
pub const NIL_REQUEST_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Opaque correlation token (UUID string form).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// The all-zero sentinel id.
    #[must_use]
    pub fn nil() -> Self {
        Self(NIL_REQUEST_ID.to_string())
    }

    /// Mint a fresh random id (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// True if this is the all-zero sentinel.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0 == NIL_REQUEST_ID
    }

    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume self and return the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0
    }
}
