//! `Type`: the immutable per-type-id descriptor items are instantiated
//! from (§3).

use crate::ids::{AttributeId, EffectId, GroupId, ItemTypeId, SkillTypeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemTypeDef {
    pub type_id: ItemTypeId,
    pub base_attrs: HashMap<AttributeId, f64>,
    pub effects: Vec<EffectId>,
    pub default_effect: Option<EffectId>,
    pub group: GroupId,
    pub required_skills: Vec<SkillTypeId>,
}

impl ItemTypeDef {
    pub fn new(type_id: ItemTypeId, group: GroupId) -> Self {
        Self {
            type_id,
            base_attrs: HashMap::new(),
            effects: Vec::new(),
            default_effect: None,
            group,
            required_skills: Vec::new(),
        }
    }

    pub fn with_base_attr(mut self, attr: AttributeId, value: f64) -> Self {
        self.base_attrs.insert(attr, value);
        self
    }

    pub fn with_effect(mut self, effect_id: EffectId) -> Self {
        self.effects.push(effect_id);
        self
    }

    pub fn with_default_effect(mut self, effect_id: EffectId) -> Self {
        self.effects.push(effect_id);
        self.default_effect = Some(effect_id);
        self
    }

    pub fn with_required_skill(mut self, skill: SkillTypeId) -> Self {
        self.required_skills.push(skill);
        self
    }
}

/// Read-only lookup for `Type` descriptors. An external collaborator per
/// §1 ("the static type/effect/modifier database"): the fit never
/// constructs or mutates these, only reads them.
pub trait TypeDataSource {
    fn type_def(&self, type_id: ItemTypeId) -> Option<&ItemTypeDef>;
}
