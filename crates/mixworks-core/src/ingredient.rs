//! Ingredients: immutable raw-material descriptors.
//!
//! Shape and pattern are presentational tags derived once at construction
//! from the structure and speed. Unknown structure/speed tags degrade to
//! defaults in [`shape_for_structure`] and [`pattern_for_speed`].

use crate::id::IngredientId;
use crate::rng::SimRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Speed class
// ---------------------------------------------------------------------------

/// Processing-speed class. Governs pot compatibility and processing cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speed {
    Easy,
    Medium,
    Hard,
}

impl Speed {
    pub const ALL: [Speed; 3] = [Speed::Easy, Speed::Medium, Speed::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Speed::Easy => "easy",
            Speed::Medium => "medium",
            Speed::Hard => "hard",
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown speed class '{0}' (expected easy, medium or hard)")]
pub struct ParseSpeedError(pub String);

impl FromStr for Speed {
    type Err = ParseSpeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Speed::ALL
            .into_iter()
            .find(|speed| speed.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseSpeedError(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Structure, shape, pattern
// ---------------------------------------------------------------------------

/// The closed set of structural categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Structure {
    Grain,
    CoarseGrain,
    Smooth,
    Slimy,
}

impl Structure {
    pub const ALL: [Structure; 4] = [
        Structure::Grain,
        Structure::CoarseGrain,
        Structure::Smooth,
        Structure::Slimy,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Structure::Grain => "grain",
            Structure::CoarseGrain => "coarse_grain",
            Structure::Smooth => "smooth",
            Structure::Slimy => "slimy",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Structure::ALL.into_iter().find(|s| s.tag() == tag)
    }
}

/// Drawn outline of an ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Grain,
    Rough,
    Slimy,
    Oval,
}

/// Fill pattern of an ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    Wave,
    Striped,
    Dotted,
    Solid,
}

/// Shape lookup by structure tag. Unknown tags get [`Shape::Grain`].
pub fn shape_for_structure(tag: &str) -> Shape {
    match Structure::from_tag(tag) {
        Some(Structure::CoarseGrain) => Shape::Rough,
        Some(Structure::Grain) => Shape::Grain,
        Some(Structure::Slimy) => Shape::Slimy,
        Some(Structure::Smooth) => Shape::Oval,
        None => Shape::Grain,
    }
}

impl Speed {
    pub fn pattern(self) -> Pattern {
        match self {
            Speed::Easy => Pattern::Wave,
            Speed::Medium => Pattern::Striped,
            Speed::Hard => Pattern::Dotted,
        }
    }
}

/// Pattern lookup by speed tag, for tags read from outside. Unknown tags
/// get [`Pattern::Solid`].
pub fn pattern_for_speed(tag: &str) -> Pattern {
    tag.parse::<Speed>().map_or(Pattern::Solid, Speed::pattern)
}

// ---------------------------------------------------------------------------
// Ingredient
// ---------------------------------------------------------------------------

/// Everything needed to build an ingredient except its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientSpec {
    /// Raw color string in any supported encoding.
    pub color: String,
    /// Raw structure tag; see [`Structure`].
    pub structure: String,
    pub speed: Speed,
    pub min_time_ms: u64,
}

impl IngredientSpec {
    pub fn new(color: impl Into<String>, structure: Structure, speed: Speed) -> Self {
        Self {
            color: color.into(),
            structure: structure.tag().to_string(),
            speed,
            min_time_ms: 0,
        }
    }

    pub fn with_min_time(mut self, min_time_ms: u64) -> Self {
        self.min_time_ms = min_time_ms;
        self
    }

    /// A random ingredient: random hue at the given saturation/lightness,
    /// random structure and speed.
    pub fn random(rng: &mut SimRng, style: &IngredientStyle) -> Self {
        let hue = rng.next_unit() * 360.0;
        let structure = rng
            .pick(&Structure::ALL)
            .copied()
            .unwrap_or(Structure::Grain);
        let speed = rng.pick(&Speed::ALL).copied().unwrap_or(Speed::Easy);
        Self {
            color: format!("hsl({hue:.2}, {}%, {}%)", style.saturation, style.lightness),
            structure: structure.tag().to_string(),
            speed,
            min_time_ms: style.min_time_ms,
        }
    }
}

/// Parameters of randomly created ingredients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientStyle {
    pub saturation: u8,
    pub lightness: u8,
    pub min_time_ms: u64,
}

impl Default for IngredientStyle {
    fn default() -> Self {
        Self {
            saturation: 80,
            lightness: 60,
            min_time_ms: 2000,
        }
    }
}

/// An immutable raw material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    id: IngredientId,
    color: String,
    structure: String,
    speed: Speed,
    min_time_ms: u64,
    shape: Shape,
    pattern: Pattern,
}

impl Ingredient {
    pub fn new(id: IngredientId, spec: IngredientSpec) -> Self {
        let shape = shape_for_structure(&spec.structure);
        let pattern = spec.speed.pattern();
        Self {
            id,
            color: spec.color,
            structure: spec.structure,
            speed: spec.speed,
            min_time_ms: spec.min_time_ms,
            shape,
            pattern,
        }
    }

    pub fn id(&self) -> IngredientId {
        self.id
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn structure(&self) -> &str {
        &self.structure
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn min_time_ms(&self) -> u64 {
        self.min_time_ms
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// The descriptor this ingredient was built from, e.g. for re-dropping.
    pub fn spec(&self) -> IngredientSpec {
        IngredientSpec {
            color: self.color.clone(),
            structure: self.structure.clone(),
            speed: self.speed,
            min_time_ms: self.min_time_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds ingredients from descriptors. Pots are handed one at construction
/// and use it to materialize dropped ingredients.
pub trait IngredientFactory {
    fn build(&self, id: IngredientId, spec: IngredientSpec) -> Ingredient;
}

/// The default factory: plain [`Ingredient::new`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardIngredientFactory;

impl IngredientFactory for StandardIngredientFactory {
    fn build(&self, id: IngredientId, spec: IngredientSpec) -> Ingredient {
        Ingredient::new(id, spec)
    }
}
