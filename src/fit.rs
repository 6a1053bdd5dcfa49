//! `Fit`: the mutable bundle of items that ties the register, calculator
//! and RAH simulator together behind a small synchronous API (§2, §5).
//!
//! There is no single teacher file this corresponds to — it plays the role
//! the teacher's `AttributesPlugin` (`lib.rs`) plays for its own domain,
//! wiring components and systems together — but since §2 rules out
//! threads, timers and a schedule, the wiring here is a set of plain
//! methods driving a [`bevy::ecs::world::World`] directly rather than an
//! `App`/`Plugin`/system-schedule graph. Each public method corresponds to
//! one of §5's "top-level calls": register mutations and cache
//! invalidation it triggers complete before the method returns.

use crate::error::{AttributeMetadataError, Diagnostic};
use crate::ids::{AttributeId, EffectId, ItemTypeId};
use crate::item::{AttributeCache, ItemId, ItemRecord};
use crate::modifier::{Domain, Modifier, State};
use crate::rah::{self, DamageProfile, RahAttributeIds, SimulationConfig};
use crate::register::{AffecteeMembership, AffectionRegister, FitBindings};
use crate::registry::DataSource;
use bevy::ecs::component::Component;
use bevy::ecs::world::World;

/// Which modifiers from an item's effects are currently registered as
/// affectors, so [`Fit::sync_affectors`] can unregister exactly those
/// before re-evaluating against the item's (possibly new) state.
#[derive(Debug, Clone, Default, Component)]
struct ActiveModifiers(Vec<Modifier>);

/// Binds the static RAH effect id and attribute roles (§4.3) a fit needs
/// to recognize and simulate reactive armor hardeners. A fit with no
/// [`RahConfig`] never runs the simulator, even if the data source
/// contains RAH-shaped items.
#[derive(Debug, Clone)]
pub struct RahConfig {
    pub effect_id: EffectId,
    pub attribute_ids: RahAttributeIds,
    pub simulation: SimulationConfig,
}

/// The mutable bundle of items a fit's attribute calculations are computed
/// over (§3). Generic over the read-only data source so tests can supply a
/// minimal in-memory stand-in without pulling in a real game-data loader.
pub struct Fit<D: DataSource> {
    world: World,
    data: D,
    register: AffectionRegister,
    current_ship: Option<ItemId>,
    current_char: Option<ItemId>,
    rah_config: Option<RahConfig>,
    damage_profile: DamageProfile,
    rah_dirty: bool,
    diagnostics: Vec<Diagnostic>,
}

impl<D: DataSource> Fit<D> {
    pub fn new(data: D) -> Self {
        Self {
            world: World::new(),
            data,
            register: AffectionRegister::new(),
            current_ship: None,
            current_char: None,
            rah_config: None,
            damage_profile: DamageProfile::default(),
            rah_dirty: false,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_rah_config(mut self, config: RahConfig) -> Self {
        self.rah_config = Some(config);
        self
    }

    pub fn set_damage_profile(&mut self, profile: DamageProfile) {
        self.damage_profile = profile;
        self.rah_dirty = true;
    }

    pub fn current_ship(&self) -> Option<ItemId> {
        self.current_ship
    }

    pub fn current_character(&self) -> Option<ItemId> {
        self.current_char
    }

    /// The diagnostics logged so far (§6), oldest first. Kept alongside the
    /// global logger so tests can assert on the exact messages without
    /// capturing stdout.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn clear_diagnostics(&mut self) {
        self.diagnostics.clear();
    }

    fn bindings(&self) -> FitBindings {
        FitBindings {
            current_ship: self.current_ship,
            current_char: self.current_char,
        }
    }

    fn log_all(&mut self, entries: Vec<Diagnostic>) {
        for diagnostic in entries {
            bevy::log::warn!("{}", diagnostic.message);
            self.diagnostics.push(diagnostic);
        }
    }

    /// Adds a new item of the given type to the fit, offline by default
    /// (§3: every item starts at its lowest state until explicitly raised).
    pub fn add_item(&mut self, type_id: ItemTypeId) -> ItemId {
        let entity = self
            .world
            .spawn((
                ItemRecord::new(type_id),
                AttributeCache::default(),
                ActiveModifiers::default(),
            ))
            .id();
        let item = ItemId::from_entity(entity);

        let membership = self.membership_of(item);
        self.register.register_affectee(item, membership, self.bindings());
        self.sync_affectors(item);
        self.invalidate();
        item
    }

    /// Removes an item from the fit (§4.1's unregistration rules), clearing
    /// its ship/character binding if it held one.
    pub fn remove_item(&mut self, item: ItemId) {
        let others = self
            .world
            .get::<ItemRecord>(item.entity())
            .map(|record| record.others.clone())
            .unwrap_or_default();
        let previously = self
            .world
            .get::<ActiveModifiers>(item.entity())
            .map(|modifiers| modifiers.0.clone())
            .unwrap_or_default();
        let bindings = self.bindings();
        for modifier in previously {
            self.register.unregister_affector(item, modifier, &others, bindings);
        }
        self.register.unregister_affectee(item);
        self.world.despawn(item.entity());

        if self.current_ship == Some(item) {
            self.current_ship = None;
        }
        if self.current_char == Some(item) {
            self.current_char = None;
        }
        self.invalidate();
    }

    /// Raises or lowers an item's state, re-evaluating which of its
    /// effects' modifiers now qualify as affectors (§3, §6's state
    /// threshold table).
    pub fn set_state(&mut self, item: ItemId, state: State) {
        if let Some(mut record) = self.world.get_mut::<ItemRecord>(item.entity()) {
            record.state = state;
        }
        self.sync_affectors(item);
        self.invalidate();
    }

    pub fn set_modifier_domain(&mut self, item: ItemId, domain: Option<Domain>) {
        if let Some(mut record) = self.world.get_mut::<ItemRecord>(item.entity()) {
            record.modifier_domain = domain;
        }
        self.resync_membership(item);
        self.invalidate();
    }

    pub fn set_owner_modifiable(&mut self, item: ItemId, owner_modifiable: bool) {
        if let Some(mut record) = self.world.get_mut::<ItemRecord>(item.entity()) {
            record.owner_modifiable = owner_modifiable;
        }
        self.resync_membership(item);
        self.invalidate();
    }

    /// Binds or clears the fit's ship, re-resolving every self-domain
    /// affector that targets "the ship" (§9).
    pub fn set_ship(&mut self, ship: Option<ItemId>) {
        let old = self.bindings();
        self.current_ship = ship;
        let new = self.bindings();
        self.register.rebind(old, new);
        self.invalidate();
    }

    pub fn set_character(&mut self, character: Option<ItemId>) {
        let old = self.bindings();
        self.current_char = character;
        let new = self.bindings();
        self.register.rebind(old, new);
        self.invalidate();
    }

    /// Establishes (or clears, with `charge = None`) the `other` relation
    /// between a module and its loaded charge (§3). Symmetric: the charge
    /// also gains the module in its own `others` set.
    pub fn set_charge(&mut self, module: ItemId, charge: Option<ItemId>) {
        let previous_charge = self
            .world
            .get::<ItemRecord>(module.entity())
            .and_then(|record| record.others.iter().next().copied());

        if let Some(mut record) = self.world.get_mut::<ItemRecord>(module.entity()) {
            record.others.clear();
            if let Some(c) = charge {
                record.others.insert(c);
            }
        }
        if let Some(prev) = previous_charge {
            if let Some(mut record) = self.world.get_mut::<ItemRecord>(prev.entity()) {
                record.others.remove(&module);
            }
            self.resync_membership(prev);
        }
        if let Some(c) = charge {
            if let Some(mut record) = self.world.get_mut::<ItemRecord>(c.entity()) {
                record.others.insert(module);
            }
            self.resync_membership(c);
        }
        self.resync_membership(module);
        self.invalidate();
    }

    /// `get(item, attr_id) → number | None | error` (§6). Runs the RAH
    /// simulator first if a prior mutation left it due for a rerun.
    pub fn get_attribute(
        &mut self,
        item: ItemId,
        attr_id: AttributeId,
    ) -> Result<Option<f64>, AttributeMetadataError> {
        self.ensure_rah_simulated();
        let calculator = crate::calculator::Calculator::new(&self.data, &self.register);
        let result = calculator.get(&mut self.world, item, attr_id);
        let diagnostics = calculator.drain_diagnostics();
        drop(calculator);
        self.log_all(diagnostics);
        result
    }

    /// Drops every item's memoized attribute value (§4.2's "simpler and
    /// sufficient" invalidation policy) without otherwise touching the
    /// register or any item's state.
    pub fn clear_volatile(&mut self) {
        self.invalidate();
    }

    fn invalidate(&mut self) {
        let mut query = self.world.query::<&mut AttributeCache>();
        for mut cache in query.iter_mut(&mut self.world) {
            cache.clear();
        }
        self.rah_dirty = true;
    }

    fn membership_of(&self, item: ItemId) -> AffecteeMembership {
        let record = self.world.get::<ItemRecord>(item.entity());
        let Some(record) = record else {
            return AffecteeMembership::default();
        };
        let type_def = self.data.type_def(record.type_id);
        AffecteeMembership {
            domain: record.modifier_domain,
            group: type_def.map(|t| t.group),
            required_skills: type_def.map(|t| t.required_skills.clone()).unwrap_or_default(),
            owner_modifiable: record.owner_modifiable,
            others: record.others.clone(),
        }
    }

    fn resync_membership(&mut self, item: ItemId) {
        if !self.register.is_registered(item) {
            return;
        }
        self.register.unregister_affectee(item);
        let membership = self.membership_of(item);
        self.register.register_affectee(item, membership, self.bindings());
        self.sync_affectors(item);
    }

    /// Unregisters every modifier this item previously published as an
    /// affector, then re-registers the ones whose state threshold the
    /// item's current state now meets (§3, §6).
    fn sync_affectors(&mut self, item: ItemId) {
        let Some(record) = self.world.get::<ItemRecord>(item.entity()) else {
            return;
        };
        let state = record.state;
        let type_id = record.type_id;
        let others = record.others.clone();
        let bindings = self.bindings();

        let previously = self
            .world
            .get::<ActiveModifiers>(item.entity())
            .map(|m| m.0.clone())
            .unwrap_or_default();
        for modifier in previously {
            self.register.unregister_affector(item, modifier, &others, bindings);
        }

        let Some(type_def) = self.data.type_def(type_id) else {
            return;
        };
        let effect_ids = type_def.effects.clone();

        let mut now_active = Vec::new();
        let mut diagnostics = Vec::new();
        for effect_id in effect_ids {
            let Some(effect) = self.data.effect(effect_id) else {
                continue;
            };
            for modifier in &effect.modifiers {
                if state >= modifier.state {
                    let diags =
                        self.register.register_affector(item, type_id, *modifier, &others, bindings);
                    diagnostics.extend(diags);
                    now_active.push(*modifier);
                }
            }
        }

        self.world.entity_mut(item.entity()).insert(ActiveModifiers(now_active));
        self.log_all(diagnostics);
    }

    /// A module qualifies as a RAH iff its type's `default_effect` is the
    /// configured RAH effect id and its state is ≥ active (§4.3).
    fn find_rahs(&mut self) -> Vec<ItemId> {
        let Some(rah_config) = &self.rah_config else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut query = self.world.query::<(bevy::ecs::entity::Entity, &ItemRecord)>();
        for (entity, record) in query.iter(&self.world) {
            if record.state < State::Active {
                continue;
            }
            if let Some(type_def) = self.data.type_def(record.type_id) {
                if type_def.default_effect == Some(rah_config.effect_id) {
                    out.push(ItemId::from_entity(entity));
                }
            }
        }
        out
    }

    fn ensure_rah_simulated(&mut self) {
        if !self.rah_dirty {
            return;
        }
        self.rah_dirty = false;
        let Some(ship) = self.current_ship else {
            return;
        };
        let Some(rah_config) = self.rah_config.clone() else {
            return;
        };
        let rahs = self.find_rahs();
        if rahs.is_empty() {
            return;
        }

        let calculator = crate::calculator::Calculator::new(&self.data, &self.register);
        let diagnostics = rah::simulate(
            &mut self.world,
            &calculator,
            &rahs,
            ship,
            &rah_config.attribute_ids,
            self.damage_profile,
            &rah_config.simulation,
        );
        let calc_diagnostics = calculator.drain_diagnostics();
        drop(calculator);
        self.log_all(calc_diagnostics);
        self.log_all(diagnostics);
    }
}
