//! Pots: ordered, speed-homogeneous collections of ingredients.

use crate::color::{ColorResolver, CssColorResolver, Rgb, mean_color, resolve_color};
use crate::id::{IngredientId, PotId};
use crate::ingredient::{Ingredient, IngredientFactory, IngredientSpec, Speed};
use std::fmt;
use std::rc::Rc;

/// Why an ingredient was refused by a pot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PotError {
    #[error("ingredient speed {offered} does not match pot speed {pot}")]
    SpeedMismatch { pot: Speed, offered: Speed },
}

pub struct Pot {
    id: PotId,
    ingredients: Vec<Ingredient>,
    processed: bool,
    factory: Rc<dyn IngredientFactory>,
}

impl fmt::Debug for Pot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pot")
            .field("id", &self.id)
            .field("ingredients", &self.ingredients)
            .field("processed", &self.processed)
            .finish_non_exhaustive()
    }
}

impl Pot {
    pub fn new(id: PotId, factory: Rc<dyn IngredientFactory>) -> Self {
        Self {
            id,
            ingredients: Vec::new(),
            processed: false,
            factory,
        }
    }

    pub fn id(&self) -> PotId {
        self.id
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Speed shared by every ingredient, `None` while empty.
    pub fn speed(&self) -> Option<Speed> {
        self.ingredients.first().map(Ingredient::speed)
    }

    /// Whether `ingredient` would keep the pot speed-homogeneous.
    pub fn can_add(&self, ingredient: &Ingredient) -> bool {
        self.ingredients
            .iter()
            .all(|existing| existing.speed() == ingredient.speed())
    }

    /// Append an ingredient. On rejection the pot is untouched.
    pub fn add_ingredient(&mut self, ingredient: Ingredient) -> Result<(), PotError> {
        if let Some(pot) = self.speed()
            && pot != ingredient.speed()
        {
            return Err(PotError::SpeedMismatch {
                pot,
                offered: ingredient.speed(),
            });
        }
        self.ingredients.push(ingredient);
        Ok(())
    }

    /// Build an ingredient with this pot's factory, then add it.
    pub fn add_from_spec(
        &mut self,
        id: IngredientId,
        spec: IngredientSpec,
    ) -> Result<&Ingredient, PotError> {
        let ingredient = self.factory.build(id, spec);
        self.add_ingredient(ingredient)?;
        Ok(&self.ingredients[self.ingredients.len() - 1])
    }

    /// Flag the pot processed. Returns `false` if it already was.
    pub fn mark_processed(&mut self) -> bool {
        !std::mem::replace(&mut self.processed, true)
    }

    /// Mixed color using the built-in CSS resolver.
    pub fn mixed_color(&self) -> Option<Rgb> {
        self.mixed_color_with(&CssColorResolver)
    }

    /// Per-channel mean of every resolvable ingredient color. Unresolvable
    /// colors are skipped and do not count toward the divisor.
    pub fn mixed_color_with(&self, resolver: &dyn ColorResolver) -> Option<Rgb> {
        let resolved: Vec<Rgb> = self
            .ingredients
            .iter()
            .filter_map(|ing| {
                let rgb = resolve_color(ing.color(), resolver);
                if rgb.is_none() {
                    tracing::warn!(
                        pot = self.id.0,
                        ingredient = ing.id().0,
                        color = ing.color(),
                        "could not resolve ingredient color"
                    );
                }
                rgb
            })
            .collect();
        mean_color(&resolved)
    }
}
