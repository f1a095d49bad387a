//! Role catalog types.
//!
//! A role is a named permission bucket assignable to users. Its slug is
//! derived from the name exactly once, at creation, and is never
//! recomputed afterwards, even if the name changes.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use netdock_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a role record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a new random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// URL-safe role slug.
///
/// Slugs are unique across the role catalog and non-empty whenever the
/// role name is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slug(String);

impl Slug {
    /// Creates a slug from an already-normalized value.
    ///
    /// Accepts lowercase ASCII letters, digits, underscores and hyphens.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(AppError::Validation("slug must not be empty".to_owned()));
        }

        let valid = value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !valid {
            return Err(AppError::Validation(format!(
                "slug '{value}' contains characters outside [a-z0-9_-]"
            )));
        }

        Ok(Self(value))
    }

    /// Derives a slug from a role name.
    ///
    /// Lowercases the name, keeps alphanumeric runs and underscores, and
    /// collapses everything else into single hyphens.
    pub fn derive(name: &str) -> AppResult<Self> {
        let mut slug = String::with_capacity(name.len());
        let mut pending_separator = false;

        for c in name.trim().to_lowercase().chars() {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                if pending_separator && !slug.is_empty() {
                    slug.push('-');
                }
                pending_separator = false;
                slug.push(c);
            } else {
                pending_separator = true;
            }
        }

        if slug.is_empty() {
            return Err(AppError::Validation(format!(
                "role name '{name}' does not produce a usable slug"
            )));
        }

        Ok(Self(slug))
    }

    /// Returns the slug string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Slug {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Fine-grained capability token attached to a role.
///
/// Capabilities are opaque to the access-control core; they are carried
/// for downstream collaborators and never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Capability(String);

impl Capability {
    /// Creates a validated capability token.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        Ok(Self(NonEmptyString::new(value)?.into()))
    }

    /// Returns the capability token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// A named permission bucket with a unique, derived slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    name: String,
    slug: Slug,
    capabilities: BTreeSet<Capability>,
}

impl Role {
    /// Creates a role, deriving the slug from the name when none is given.
    ///
    /// The slug passed here (or derived here) is final: role renames do
    /// not recompute it.
    pub fn new(
        id: RoleId,
        name: impl Into<String>,
        slug: Option<Slug>,
        capabilities: BTreeSet<Capability>,
    ) -> AppResult<Self> {
        let name: String = NonEmptyString::new(name)?.into();
        let slug = match slug {
            Some(slug) => slug,
            None => Slug::derive(&name)?,
        };

        Ok(Self {
            id,
            name,
            slug,
            capabilities,
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the unique role name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the unique role slug.
    #[must_use]
    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    /// Returns the capability tokens attached to this role.
    #[must_use]
    pub fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    /// Returns whether `identifier` equals this role's name or slug,
    /// ignoring case.
    #[must_use]
    pub fn is_called(&self, identifier: &str) -> bool {
        identifier.eq_ignore_ascii_case(self.name.as_str())
            || identifier.eq_ignore_ascii_case(self.slug.as_str())
    }
}

/// Matches a role by case-insensitive equality on name or slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMatcher(String);

impl RoleMatcher {
    /// Creates a matcher from a role name or slug.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self(identifier.into())
    }

    /// Returns whether the matcher accepts the given role.
    #[must_use]
    pub fn matches(&self, role: &Role) -> bool {
        role.is_called(self.0.as_str())
    }

    /// Returns the identifier this matcher was built from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for RoleMatcher {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<&str> for RoleMatcher {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Role reference accepted at the selection boundary.
///
/// Callers either hold a resolved role already or pass a bare identifier
/// that still needs a catalog lookup.
#[derive(Debug, Clone)]
pub enum RoleRef {
    /// An already-resolved role value.
    Role(Role),
    /// A slug or name still to be looked up.
    Identifier(String),
}

impl From<Role> for RoleRef {
    fn from(value: Role) -> Self {
        Self::Role(value)
    }
}

impl From<&str> for RoleRef {
    fn from(value: &str) -> Self {
        Self::Identifier(value.to_owned())
    }
}
