//! Attribute metadata: the small, mostly-static descriptor every attribute
//! id must resolve to before the calculator can do anything with it.

use crate::ids::AttributeId;
use serde::{Deserialize, Serialize};

/// Metadata about a single attribute, independent of any item.
///
/// Mirrors the teacher's per-attribute `AttributeComponent` (base/current
/// value pair) but as data rather than a generated component type, since
/// attribute identity here is a runtime id, not a Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub id: AttributeId,
    /// Non-stackable attributes apply the stacking penalty (§4.2) when more
    /// than one affector in the same operator class contributes to them.
    pub stackable: bool,
    /// Controls which direction "favors" a contribution when the stacking
    /// penalty has to rank contributions, and which side wins ties in the
    /// assignment classes.
    pub high_is_good: bool,
    /// When set, the calculated value is clamped to `[0, get(item, max_attribute)]`.
    pub max_attribute: Option<AttributeId>,
    pub default_value: Option<f64>,
}

impl AttributeDef {
    pub fn new(id: AttributeId) -> Self {
        Self {
            id,
            stackable: false,
            high_is_good: true,
            max_attribute: None,
            default_value: None,
        }
    }

    pub fn stackable(mut self, stackable: bool) -> Self {
        self.stackable = stackable;
        self
    }

    pub fn high_is_good(mut self, high_is_good: bool) -> Self {
        self.high_is_good = high_is_good;
        self
    }

    pub fn max_attribute(mut self, max_attribute: AttributeId) -> Self {
        self.max_attribute = Some(max_attribute);
        self
    }

    pub fn default_value(mut self, value: f64) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Read-only lookup for attribute metadata. An external collaborator per
/// §1: the fit never constructs or mutates these, only reads them.
pub trait AttributeDataSource {
    fn attribute_def(&self, attr_id: AttributeId) -> Option<&AttributeDef>;
}
