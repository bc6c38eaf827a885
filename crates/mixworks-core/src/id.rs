//! Typed identifiers and the composite string ids used at the boundary.
//!
//! Inside the engine every entity is addressed by a small `Copy` newtype.
//! The presentation layer refers to pots and ingredients by composite
//! strings such as `pot-3` and `ingredient-12`; those are parsed here and
//! nowhere else.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies an ingredient. Unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IngredientId(pub u32);

/// Identifies a pot. Unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PotId(pub u32);

/// Identifies a machine. Unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MachineId(pub u32);

/// Identifies a hall (a zone of machines).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HallId(pub u32);

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for HallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Composite external ids
// ---------------------------------------------------------------------------

const POT_PREFIX: &str = "pot";
const INGREDIENT_PREFIX: &str = "ingredient";
const DELIMITER: char = '-';

/// A composite identifier as used by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalId {
    Pot(PotId),
    Ingredient(IngredientId),
}

/// Why a composite identifier could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExternalIdError {
    #[error("missing '-' delimiter in '{0}'")]
    MissingDelimiter(String),
    #[error("unknown id prefix '{0}'")]
    UnknownPrefix(String),
    #[error("invalid numeric suffix in '{0}'")]
    InvalidNumber(String),
}

impl FromStr for ExternalId {
    type Err = ExternalIdError;

    /// The prefix is the text before the first `-`. The number is the run of
    /// leading digits in the second `-` segment; whatever follows it is
    /// ignored, so `pot-12abc` and `pot-12-3` both name pot 12.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = s.split(DELIMITER);
        let prefix = segments.next().unwrap_or_default();
        let suffix = segments
            .next()
            .ok_or_else(|| ExternalIdError::MissingDelimiter(s.to_string()))?;
        let kind = match prefix {
            POT_PREFIX | INGREDIENT_PREFIX => prefix,
            other => return Err(ExternalIdError::UnknownPrefix(other.to_string())),
        };
        let digits = suffix
            .find(|c: char| !c.is_ascii_digit())
            .map_or(suffix, |end| &suffix[..end]);
        let number: u32 = digits
            .parse()
            .map_err(|_| ExternalIdError::InvalidNumber(s.to_string()))?;
        Ok(if kind == POT_PREFIX {
            ExternalId::Pot(PotId(number))
        } else {
            ExternalId::Ingredient(IngredientId(number))
        })
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalId::Pot(id) => write!(f, "{POT_PREFIX}{DELIMITER}{}", id.0),
            ExternalId::Ingredient(id) => write!(f, "{INGREDIENT_PREFIX}{DELIMITER}{}", id.0),
        }
    }
}

impl PotId {
    /// Parse a `pot-<n>` reference. Anything else yields `None`.
    pub fn from_external(s: &str) -> Option<Self> {
        match s.parse() {
            Ok(ExternalId::Pot(id)) => Some(id),
            _ => None,
        }
    }

    /// The composite `pot-<n>` form.
    pub fn external(self) -> String {
        ExternalId::Pot(self).to_string()
    }
}

impl IngredientId {
    /// Parse an `ingredient-<n>` reference. Anything else yields `None`.
    pub fn from_external(s: &str) -> Option<Self> {
        match s.parse() {
            Ok(ExternalId::Ingredient(id)) => Some(id),
            _ => None,
        }
    }

    /// The composite `ingredient-<n>` form.
    pub fn external(self) -> String {
        ExternalId::Ingredient(self).to_string()
    }
}
