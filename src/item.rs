//! Items: mutable instances of a [`crate::type_def::ItemTypeDef`] living in
//! a fit (§3).
//!
//! Per §9's ownership note — "an arena of items indexed by handle avoids
//! dangling references when unregistering concurrently with iteration" —
//! items are stored as entities in a [`bevy::ecs::world::World`] rather
//! than behind `Rc`/`Arc`. This mirrors the teacher's own choice to keep
//! attribute state on ECS components addressed by `Entity`, just without
//! the surrounding `App`/`Plugin`/schedule machinery the teacher wires
//! those components into: a fit drives its world directly and
//! synchronously, matching §2's "no threads, no I/O, no timers" rule.

use crate::ids::ItemTypeId;
use crate::modifier::{Domain, State};
use bevy::ecs::component::Component;
use bevy::ecs::entity::Entity;
use std::collections::{HashMap, HashSet};

/// Opaque handle to an item registered in a [`crate::fit::Fit`]. Stable for
/// the item's lifetime in the fit; never reused while the item is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(pub(crate) Entity);

impl ItemId {
    pub fn from_entity(entity: Entity) -> Self {
        Self(entity)
    }

    pub fn entity(self) -> Entity {
        self.0
    }

    /// A stable numeric surrogate for this item, used as a deterministic
    /// tie-break key where the register has no notion of insertion order
    /// (§9's stacking-penalty open question).
    pub fn to_bits(self) -> u64 {
        self.0.to_bits()
    }
}

/// The mutable per-item record (§3): type binding, current state, resolved
/// domain membership and the `other` relation. Stored as a component on the
/// item's entity.
#[derive(Debug, Clone, Component)]
pub struct ItemRecord {
    pub type_id: ItemTypeId,
    pub state: State,
    /// The absolute domain this item places itself into (ship or
    /// character), if any. `None` for items that occupy no domain of their
    /// own (e.g. a charge, which is only reachable via `others`).
    pub modifier_domain: Option<Domain>,
    pub owner_modifiable: bool,
    /// Peers reachable through the `other` relation (a module's loaded
    /// charge, and the charge's carrying module).
    pub others: HashSet<ItemId>,
}

impl ItemRecord {
    pub fn new(type_id: ItemTypeId) -> Self {
        Self {
            type_id,
            state: State::Offline,
            modifier_domain: None,
            owner_modifiable: false,
            others: HashSet::new(),
        }
    }
}

/// The item's memoized attribute view (§3: "lazily computed mapping from
/// attribute id to value, memoized until invalidated"). Kept as a separate
/// component from [`ItemRecord`] so the calculator can hold a mutable
/// borrow of the cache while reading the record immutably.
#[derive(Debug, Clone, Component, Default)]
pub struct AttributeCache(pub HashMap<crate::ids::AttributeId, f64>);

impl AttributeCache {
    pub fn get(&self, attr_id: crate::ids::AttributeId) -> Option<f64> {
        self.0.get(&attr_id).copied()
    }

    pub fn insert(&mut self, attr_id: crate::ids::AttributeId, value: f64) {
        self.0.insert(attr_id, value);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}
