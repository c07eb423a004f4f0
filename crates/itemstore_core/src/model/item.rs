//! Item domain model.
//!
//! # Responsibility
//! - Define the persisted record shape and its identity.
//! - Validate payload limits before any write reaches storage.
//!
//! # Invariants
//! - `id` is positive and unique across all live rows.
//! - Items are never mutated in place once stored; replacement is
//!   delete-then-insert.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Primary key of an `Item` row.
pub type ItemId = i64;

/// Maximum `name` length in characters.
pub const MAX_NAME_CHARS: usize = 512;
/// Maximum `description` length in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 4096;

/// Persisted item record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Identity column; positive, caller-assigned or storage-generated.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Optional free-form details.
    pub description: Option<String>,
}

/// Item payload without identity, used when storage assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub description: Option<String>,
}

/// Validation failures for item payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    NonPositiveId(ItemId),
    NameTooLong { chars: usize, max: usize },
    DescriptionTooLong { chars: usize, max: usize },
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveId(id) => write!(f, "item id must be positive, got {id}"),
            Self::NameTooLong { chars, max } => {
                write!(f, "item name has {chars} chars, max is {max}")
            }
            Self::DescriptionTooLong { chars, max } => {
                write!(f, "item description has {chars} chars, max is {max}")
            }
        }
    }
}

impl Error for ItemValidationError {}

impl Item {
    /// Creates an item with a caller-provided identity and no description.
    ///
    /// # Errors
    /// - Returns `NonPositiveId` when `id <= 0`.
    /// - Returns `NameTooLong` when `name` exceeds `MAX_NAME_CHARS`.
    pub fn new(id: ItemId, name: impl Into<String>) -> Result<Self, ItemValidationError> {
        let item = Self {
            id,
            name: name.into(),
            description: None,
        };
        item.validate()?;
        Ok(item)
    }

    /// Returns this item with `description` set.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Checks identity and payload limits.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.id <= 0 {
            return Err(ItemValidationError::NonPositiveId(self.id));
        }
        validate_payload(&self.name, self.description.as_deref())
    }
}

impl NewItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Checks payload limits.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        validate_payload(&self.name, self.description.as_deref())
    }

    /// Binds this payload to a storage-assigned identity.
    pub fn into_item(self, id: ItemId) -> Item {
        Item {
            id,
            name: self.name,
            description: self.description,
        }
    }
}

fn validate_payload(name: &str, description: Option<&str>) -> Result<(), ItemValidationError> {
    let name_chars = name.chars().count();
    if name_chars > MAX_NAME_CHARS {
        return Err(ItemValidationError::NameTooLong {
            chars: name_chars,
            max: MAX_NAME_CHARS,
        });
    }
    if let Some(description) = description {
        let chars = description.chars().count();
        if chars > MAX_DESCRIPTION_CHARS {
            return Err(ItemValidationError::DescriptionTooLong {
                chars,
                max: MAX_DESCRIPTION_CHARS,
            });
        }
    }
    Ok(())
}
