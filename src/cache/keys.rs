//! Cache key and tag definitions.
//!
//! `CacheKey` identifies one cached read; `Tag` identifies what a read
//! depends on so writes can find the reads they make stale.

use std::fmt;

/// Resource family a cached read belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Product,
    Order,
    User,
    /// Static client configuration (payment provider id).
    Config,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "Product",
            Self::Order => "Order",
            Self::User => "User",
            Self::Config => "Config",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag families. Only entity-backed resources carry tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagType {
    Product,
    Order,
    User,
}

impl TagType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "Product",
            Self::Order => "Order",
            Self::User => "User",
        }
    }
}

/// Tag identifier: a concrete entity id, or the collection-wide `LIST`
/// sentinel shared by every list view of a tag type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagId {
    Id(String),
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    pub kind: TagType,
    pub id: TagId,
}

impl Tag {
    pub fn id(kind: TagType, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: TagId::Id(id.into()),
        }
    }

    pub fn list(kind: TagType) -> Self {
        Self {
            kind,
            id: TagId::List,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self.id, TagId::List)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            TagId::Id(id) => write!(f, "{}:{id}", self.kind.as_str()),
            TagId::List => write!(f, "{}:LIST", self.kind.as_str()),
        }
    }
}

/// Identity of one cached read: resource kind, endpoint name and the
/// serialized query parameters, in declaration order.
///
/// Two reads with the same kind, endpoint and parameters always produce the
/// same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    kind: ResourceKind,
    endpoint: &'static str,
    params: Vec<String>,
}

impl CacheKey {
    pub fn new<I, S>(kind: ResourceKind, endpoint: &'static str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            endpoint,
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Flattened `(kind, endpoint, params...)` form, handy for assertions.
    pub fn parts(&self) -> Vec<&str> {
        let mut parts = vec![self.kind.as_str(), self.endpoint];
        parts.extend(self.params.iter().map(String::as_str));
        parts
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.endpoint)?;
        if !self.params.is_empty() {
            write!(f, "({})", self.params.join(","))?;
        }
        Ok(())
    }
}
