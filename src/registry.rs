//! A minimal in-memory implementation of the three read-only data sources
//! the fit depends on (§1's "static type/effect/modifier database").
//!
//! Grounded in the teacher's `registry/effect_registry.rs`: a thin
//! `HashMap`-backed store with `add`/`get`, registered once at startup and
//! never mutated by the systems that consume it afterwards. We collapse
//! the teacher's separate ability/effect registries (plus its asset-handle
//! indirection through `bevy::asset::Assets`) into one `DataRegistry`,
//! since this crate has no asset-loading pipeline to route through — the
//! data source contract in §1 is intentionally just "a read-only lookup".
use crate::attribute::{AttributeDataSource, AttributeDef};
use crate::effect::{Effect, EffectDataSource};
use crate::ids::{AttributeId, EffectId, ItemTypeId};
use crate::type_def::{ItemTypeDef, TypeDataSource};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct DataRegistry {
    types: HashMap<ItemTypeId, ItemTypeDef>,
    effects: HashMap<EffectId, Effect>,
    attributes: HashMap<AttributeId, AttributeDef>,
}

impl DataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&mut self, type_def: ItemTypeDef) -> &mut Self {
        self.types.insert(type_def.type_id, type_def);
        self
    }

    pub fn add_effect(&mut self, effect: Effect) -> &mut Self {
        self.effects.insert(effect.effect_id, effect);
        self
    }

    pub fn add_attribute(&mut self, attr: AttributeDef) -> &mut Self {
        self.attributes.insert(attr.id, attr);
        self
    }
}

impl TypeDataSource for DataRegistry {
    fn type_def(&self, type_id: ItemTypeId) -> Option<&ItemTypeDef> {
        self.types.get(&type_id)
    }
}

impl EffectDataSource for DataRegistry {
    fn effect(&self, effect_id: EffectId) -> Option<&Effect> {
        self.effects.get(&effect_id)
    }
}

impl AttributeDataSource for DataRegistry {
    fn attribute_def(&self, attr_id: AttributeId) -> Option<&AttributeDef> {
        self.attributes.get(&attr_id)
    }
}

/// Union of the three lookups a [`crate::fit::Fit`] needs. Blanket-implemented
/// for anything implementing all three, so a `DataRegistry` (or a test's
/// hand-rolled stand-in) works without extra glue.
pub trait DataSource: TypeDataSource + EffectDataSource + AttributeDataSource {}
impl<T> DataSource for T where T: TypeDataSource + EffectDataSource + AttributeDataSource {}
