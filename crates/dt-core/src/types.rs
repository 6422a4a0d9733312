//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
}

/// A validated domain identifier.
///
/// Domains are the hostname portion of a URL (e.g. `docs.rs`), the unit of
/// time attribution. They must be non-empty; use [`crate::resolve`] to derive
/// one from a URL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainId(String);

impl DomainId {
    /// Creates a new domain ID after validation.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::Empty { field: "domain" });
        }
        Ok(Self(id))
    }

    /// Returns the domain as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DomainId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DomainId> for String {
    fn from(id: DomainId) -> Self {
        id.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DomainId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Generates an opaque integer handle newtype for host browser objects.
macro_rules! define_host_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_host_id!(
    /// A browser tab handle, as assigned by the host.
    TabId
);

define_host_id!(
    /// A browser window handle, as assigned by the host.
    WindowId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_id_rejects_empty() {
        assert!(DomainId::new("").is_err());
        assert!(DomainId::new("example.com").is_ok());
    }

    #[test]
    fn domain_id_serializes_as_plain_string() {
        let id = DomainId::new("docs.rs").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"docs.rs\"");
        let parsed: DomainId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn domain_id_serde_rejects_empty() {
        let result: Result<DomainId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn host_ids_are_transparent_integers() {
        let tab: TabId = serde_json::from_str("42").unwrap();
        assert_eq!(tab, TabId(42));
        assert_eq!(serde_json::to_string(&WindowId(-1)).unwrap(), "-1");
    }
}
