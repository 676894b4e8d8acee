use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The identifier carried by a path element, either numeric or named.
///
/// The store allocates numeric ids; names are always caller-chosen.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyId {
    Id(i64),
    Name(String),
}

impl From<i64> for KeyId {
    fn from(id: i64) -> Self {
        KeyId::Id(id)
    }
}

impl From<&str> for KeyId {
    fn from(name: &str) -> Self {
        KeyId::Name(name.to_string())
    }
}

impl From<String> for KeyId {
    fn from(name: String) -> Self {
        KeyId::Name(name)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyId::Id(id) => write!(f, "{id}"),
            KeyId::Name(name) => write!(f, "{name}"),
        }
    }
}

/// One (kind, identifier) pair in a key path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathElement {
    kind: String,
    id: Option<KeyId>,
}

impl PathElement {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn identifier(&self) -> Option<&KeyId> {
        self.id.as_ref()
    }
}

/// A record's identity: an ordered path of (kind, identifier) elements.
///
/// The terminal element names the record itself; any preceding elements are
/// ancestors. A key is incomplete while its terminal element has no
/// identifier. The store assigns one on the first successful insert, after
/// which the key must never be re-allocated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key {
    path: Vec<PathElement>,
}

impl Key {
    /// An incomplete key of the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Key {
            path: vec![PathElement {
                kind: kind.into(),
                id: None,
            }],
        }
    }

    pub fn with_id(self, id: i64) -> Self {
        self.with_identifier(KeyId::Id(id))
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.with_identifier(KeyId::Name(name.into()))
    }

    pub fn with_identifier(mut self, id: impl Into<KeyId>) -> Self {
        if let Some(element) = self.path.last_mut() {
            element.id = Some(id.into());
        }
        self
    }

    /// Extends the path with a new terminal element, turning the current
    /// terminal into an ancestor.
    pub fn child(mut self, kind: impl Into<String>) -> Self {
        self.path.push(PathElement {
            kind: kind.into(),
            id: None,
        });
        self
    }

    /// Kind of the terminal element.
    pub fn kind(&self) -> &str {
        self.path.last().map(|element| element.kind.as_str()).unwrap_or_default()
    }

    /// Identifier of the terminal element, if assigned.
    pub fn identifier(&self) -> Option<&KeyId> {
        self.path.last().and_then(|element| element.id.as_ref())
    }

    pub fn path(&self) -> &[PathElement] {
        &self.path
    }

    /// True while the terminal element has neither a numeric id nor a name.
    pub fn is_incomplete(&self) -> bool {
        self.path.last().is_none_or(|element| element.id.is_none())
    }

    /// Assigns the store-allocated identifier to the terminal element.
    ///
    /// A key can be bound exactly once; binding a complete key is an error.
    pub fn bind_identifier(&mut self, id: impl Into<KeyId>) -> Result<(), Error> {
        if !self.is_incomplete() {
            return Err(Error::AlreadyBound(self.clone()));
        }
        let Some(element) = self.path.last_mut() else {
            return Err(Error::InvalidArgument("key has an empty path".to_string()));
        };
        element.id = Some(id.into());
        Ok(())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, element) in self.path.iter().enumerate() {
            if index > 0 {
                write!(f, "/")?;
            }
            match &element.id {
                Some(id) => write!(f, "{}:{}", element.kind, id)?,
                None => write!(f, "{}:?", element.kind)?,
            }
        }
        Ok(())
    }
}
