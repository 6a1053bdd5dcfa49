//! The Attribute Calculator (§4.2): pull-based, memoized attribute value
//! resolution over the operator pipeline.
//!
//! Grounded in the teacher's `modifier/calculator.rs`: an
//! `AttributeCalculator<T>` accumulator built by `.combine()`-ing one
//! contribution per modifier, then `.eval(base_value)`'d through a fixed
//! set/add/sub/increase/more sequence. We keep that same two-phase shape —
//! gather contributions, then evaluate them against the base value — but
//! generalize the accumulator from the teacher's 5-field struct to the
//! five operator classes of §4.2's table, add the stacking-penalty ranking
//! the teacher's simpler pipeline has no equivalent for, and replace its
//! per-attribute-type dispatch with a runtime `attr_id` lookup since
//! attributes here are data, not distinct Rust types.

use crate::attribute::AttributeDef;
use crate::error::{AttributeMetadataError, Diagnostic};
use crate::ids::AttributeId;
use crate::item::{AttributeCache, ItemId, ItemRecord};
use crate::math::stacking_penalty;
use crate::modifier::{ModOperator, OperatorClass};
use crate::register::{AffectionRegister, Affector};
use crate::registry::DataSource;
use bevy::ecs::world::World;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashSet;

/// A single affector's resolved contribution to a `(item, attr_id)`
/// computation: its operand value (`get(carrier, src_attr)`) and whether
/// its source attribute is stackable.
struct Contribution {
    affector: Affector,
    operand: f64,
    src_stackable: bool,
}

/// A deterministic surrogate for "insertion order" (§9's open question):
/// the register has no notion of insertion sequence once affectors live in
/// hash-based indices, so ties are broken by a stable ordering over the
/// affector's own fields instead. Documented as the chosen tie-break in
/// the design ledger.
fn tie_break_key(affector: &Affector) -> (u64, u8, u32, u32, usize) {
    (
        affector.carrier.to_bits(),
        affector.modifier.state as u8,
        affector.modifier.tgt_attr.0,
        affector.modifier.src_attr.0,
        affector.modifier.operator as usize,
    )
}

/// Computes `(item, attr_id)` values over a fit's world, reading affectors
/// from the Affection Register and memoizing results on each item's
/// [`AttributeCache`] component.
pub struct Calculator<'a, D: DataSource> {
    data: &'a D,
    register: &'a AffectionRegister,
    in_progress: RefCell<HashSet<(ItemId, AttributeId)>>,
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl<'a, D: DataSource> Calculator<'a, D> {
    pub fn new(data: &'a D, register: &'a AffectionRegister) -> Self {
        Self {
            data,
            register,
            in_progress: RefCell::new(HashSet::new()),
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    /// Drains and returns the diagnostics accumulated since the last drain.
    pub fn drain_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow_mut().drain(..).collect()
    }

    /// `get(item, attr_id) → number | None | error` (§6's calculator
    /// contract).
    pub fn get(
        &self,
        world: &mut World,
        item: ItemId,
        attr_id: AttributeId,
    ) -> Result<Option<f64>, AttributeMetadataError> {
        if let Some(cache) = world.get::<AttributeCache>(item.entity()) {
            if let Some(value) = cache.get(attr_id) {
                return Ok(Some(value));
            }
        }

        let key = (item, attr_id);
        if !self.in_progress.borrow_mut().insert(key) {
            self.diagnostics.borrow_mut().push(Diagnostic::warning(format!(
                "cycle detected computing attribute {attr_id} on an item; using its base value"
            )));
            return Ok(self.base_value(world, item, attr_id));
        }

        let result = self.compute(world, item, attr_id);
        self.in_progress.borrow_mut().remove(&key);
        result
    }

    fn base_value(&self, world: &World, item: ItemId, attr_id: AttributeId) -> Option<f64> {
        let attr_def = self.data.attribute_def(attr_id)?;
        self.raw_base_value(world, item, attr_id, attr_def)
    }

    fn raw_base_value(
        &self,
        world: &World,
        item: ItemId,
        attr_id: AttributeId,
        attr_def: &AttributeDef,
    ) -> Option<f64> {
        let record = world.get::<ItemRecord>(item.entity())?;
        let type_def = self.data.type_def(record.type_id)?;
        type_def
            .base_attrs
            .get(&attr_id)
            .copied()
            .or(attr_def.default_value)
    }

    fn compute(
        &self,
        world: &mut World,
        item: ItemId,
        attr_id: AttributeId,
    ) -> Result<Option<f64>, AttributeMetadataError> {
        let attr_def = *self
            .data
            .attribute_def(attr_id)
            .ok_or(AttributeMetadataError { attr_id })?;

        let Some(base) = self.raw_base_value(world, item, attr_id, &attr_def) else {
            return Ok(None);
        };

        let affectors: Vec<Affector> = self
            .register
            .get_affectors(item)
            .into_iter()
            .filter(|a| a.modifier.tgt_attr == attr_id)
            .collect();

        let mut by_class: [Vec<Contribution>; 5] = Default::default();
        for affector in affectors {
            let operand = self
                .get(world, affector.carrier, affector.modifier.src_attr)?
                .unwrap_or(0.0);
            let src_stackable = self
                .data
                .attribute_def(affector.modifier.src_attr)
                .map(|d| d.stackable)
                .unwrap_or(false);
            by_class[class_index(affector.modifier.operator.class())].push(Contribution {
                affector,
                operand,
                src_stackable,
            });
        }

        let mut value = base;
        for class in CLASS_ORDER {
            let contributions = &by_class[class_index(class)];
            if class.is_assignment() {
                if let Some(assigned) = apply_assign(contributions, &attr_def) {
                    value = assigned;
                }
            } else if class == OperatorClass::Add {
                value += apply_add(contributions, &attr_def);
            } else {
                value *= apply_mul(contributions, &attr_def);
            }
        }

        if let Some(max_attr) = attr_def.max_attribute {
            let max = self.get(world, item, max_attr)?.unwrap_or(f64::INFINITY).max(0.0);
            value = value.clamp(0.0, max);
        }

        if let Some(mut cache) = world.get_mut::<AttributeCache>(item.entity()) {
            cache.insert(attr_id, value);
        }

        Ok(Some(value))
    }
}

/// §4.2's pipeline order: each class folds into `value` in turn, assignment
/// classes overwriting it outright and the rest combining with it.
const CLASS_ORDER: [OperatorClass; 5] = [
    OperatorClass::PreAssign,
    OperatorClass::PreMul,
    OperatorClass::Add,
    OperatorClass::PostMul,
    OperatorClass::PostAssign,
];

fn class_index(class: OperatorClass) -> usize {
    match class {
        OperatorClass::PreAssign => 0,
        OperatorClass::PreMul => 1,
        OperatorClass::Add => 2,
        OperatorClass::PostMul => 3,
        OperatorClass::PostAssign => 4,
    }
}

fn multiplier_of(operator: ModOperator, operand: f64) -> f64 {
    match operator {
        ModOperator::PreMul | ModOperator::PostMul => operand,
        ModOperator::PreDiv | ModOperator::PostDiv => {
            if operand != 0.0 {
                1.0 / operand
            } else {
                1.0
            }
        }
        ModOperator::PostPercent => 1.0 + operand / 100.0,
        _ => 1.0,
    }
}

fn signed_of(operator: ModOperator, operand: f64) -> f64 {
    match operator {
        ModOperator::ModAdd => operand,
        ModOperator::ModSub => -operand,
        _ => operand,
    }
}

/// `pre_mul`/`post_mul` classes: stackable contributions multiply in at
/// full strength; non-stackable contributions are ranked by how much they
/// favor `high_is_good` and penalized per §4.2's formula.
fn apply_mul(contributions: &[Contribution], attr_def: &AttributeDef) -> f64 {
    let mut product = 1.0;
    let mut ranked: Vec<(&Contribution, f64)> = Vec::new();
    for c in contributions {
        let multiplier = multiplier_of(c.affector.modifier.operator, c.operand);
        if c.src_stackable {
            product *= multiplier;
        } else {
            ranked.push((c, multiplier));
        }
    }
    ranked.sort_by(|a, b| rank_cmp(a.1 - 1.0, b.1 - 1.0, &a.0.affector, &b.0.affector, attr_def));
    for (i, (_, multiplier)) in ranked.into_iter().enumerate() {
        product *= 1.0 + (multiplier - 1.0) * stacking_penalty(i);
    }
    product
}

/// `mod_add`/`mod_sub` class: same stackable/non-stackable split as
/// [`apply_mul`], summed instead of multiplied.
fn apply_add(contributions: &[Contribution], attr_def: &AttributeDef) -> f64 {
    let mut total = 0.0;
    let mut ranked: Vec<(&Contribution, f64)> = Vec::new();
    for c in contributions {
        let signed = signed_of(c.affector.modifier.operator, c.operand);
        if c.src_stackable {
            total += signed;
        } else {
            ranked.push((c, signed));
        }
    }
    ranked.sort_by(|a, b| rank_cmp(a.1, b.1, &a.0.affector, &b.0.affector, attr_def));
    for (i, (_, signed)) in ranked.into_iter().enumerate() {
        total += signed * stacking_penalty(i);
    }
    total
}

/// Assignment classes take exactly one value: the maximum if
/// `high_is_good`, else the minimum, ties broken by [`tie_break_key`]
/// (§4.2, §9).
fn apply_assign(contributions: &[Contribution], attr_def: &AttributeDef) -> Option<f64> {
    contributions
        .iter()
        .max_by(|a, b| {
            let ordering = a.operand.partial_cmp(&b.operand).unwrap_or(Ordering::Equal);
            let ordering = if attr_def.high_is_good { ordering } else { ordering.reverse() };
            ordering.then_with(|| {
                tie_break_key(&b.affector).cmp(&tie_break_key(&a.affector))
            })
        })
        .map(|c| c.operand)
}

/// Ranks ascending-to-descending "goodness", so index 0 after reversing is
/// the contribution most favorable to `high_is_good` and gets the lightest
/// penalty; ties fall back to [`tie_break_key`].
fn rank_cmp(
    a_delta: f64,
    b_delta: f64,
    a_affector: &Affector,
    b_affector: &Affector,
    attr_def: &AttributeDef,
) -> Ordering {
    let a_goodness = if attr_def.high_is_good { a_delta } else { -a_delta };
    let b_goodness = if attr_def.high_is_good { b_delta } else { -b_delta };
    b_goodness
        .partial_cmp(&a_goodness)
        .unwrap_or(Ordering::Equal)
        .then_with(|| tie_break_key(a_affector).cmp(&tie_break_key(b_affector)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeDef as Attr;
    use crate::ids::{AttributeId, ItemTypeId};
    use crate::item::ItemRecord;
    use crate::modifier::{ModDomain, ModTgtFilter, Modifier, State};
    use crate::register::{AffecteeMembership, FitBindings};
    use crate::registry::DataRegistry;
    use crate::type_def::ItemTypeDef;

    fn setup() -> (World, DataRegistry, AffectionRegister, ItemId) {
        let mut world = World::new();
        let mut data = DataRegistry::new();
        data.add_attribute(Attr::new(AttributeId(1211)));
        data.add_attribute(Attr::new(AttributeId(1503)));
        let type_def = ItemTypeDef::new(ItemTypeId(1), crate::ids::GroupId(1))
            .with_base_attr(AttributeId(1211), 100.0)
            .with_base_attr(AttributeId(1503), 20.0);
        data.add_type(type_def);

        let entity = world
            .spawn((ItemRecord::new(ItemTypeId(1)), AttributeCache::default()))
            .id();
        let item = ItemId::from_entity(entity);
        (world, data, AffectionRegister::new(), item)
    }

    #[test]
    fn post_percent_modifier_scales_base_value() {
        let (mut world, data, mut register, ship) = setup();
        register.register_affectee(ship, AffecteeMembership::default(), FitBindings::default());

        let modifier = Modifier::new(
            State::Offline,
            ModTgtFilter::Item,
            ModDomain::SelfDomain,
            AttributeId(1211),
            ModOperator::PostPercent,
            AttributeId(1503),
        );
        register.register_affector(
            ship,
            ItemTypeId(1),
            modifier,
            &HashSet::new(),
            FitBindings::default(),
        );

        let calculator = Calculator::new(&data, &register);
        let value = calculator.get(&mut world, ship, AttributeId(1211)).unwrap();
        assert_eq!(value, Some(120.0));
    }

    #[test]
    fn missing_descriptor_is_a_metadata_error() {
        let (mut world, data, register, ship) = setup();
        let calculator = Calculator::new(&data, &register);
        let err = calculator.get(&mut world, ship, AttributeId(9999)).unwrap_err();
        assert_eq!(err.attr_id, AttributeId(9999));
    }

    #[test]
    fn cache_hit_skips_recomputation() {
        let (mut world, data, mut register, ship) = setup();
        register.register_affectee(ship, AffecteeMembership::default(), FitBindings::default());
        let calculator = Calculator::new(&data, &register);
        assert_eq!(
            calculator.get(&mut world, ship, AttributeId(1211)).unwrap(),
            Some(100.0)
        );
        // Mutate the underlying type data; cached read must not see it.
        assert_eq!(
            calculator.get(&mut world, ship, AttributeId(1211)).unwrap(),
            Some(100.0)
        );
    }

    /// Two non-stackable `post_percent` contributions in the same class:
    /// the one with the larger effect (favoring `high_is_good`) is ranked
    /// first and keeps its full strength; the second is penalized by
    /// `math::stacking_penalty(1)`, not just dropped or applied at full
    /// strength like a stackable source would be.
    #[test]
    fn non_stackable_contributions_in_the_same_class_are_ranked_and_penalized() {
        let (mut world, mut data, mut register, ship) = setup();
        register.register_affectee(ship, AffecteeMembership::default(), FitBindings::default());

        let strong = AttributeId(5001);
        let weak = AttributeId(5002);
        data.add_attribute(Attr::new(strong).default_value(50.0));
        data.add_attribute(Attr::new(weak).default_value(20.0));

        register.register_affector(
            ship,
            ItemTypeId(1),
            Modifier::new(
                State::Offline,
                ModTgtFilter::Item,
                ModDomain::SelfDomain,
                AttributeId(1211),
                ModOperator::PostPercent,
                strong,
            ),
            &HashSet::new(),
            FitBindings::default(),
        );
        register.register_affector(
            ship,
            ItemTypeId(1),
            Modifier::new(
                State::Offline,
                ModTgtFilter::Item,
                ModDomain::SelfDomain,
                AttributeId(1211),
                ModOperator::PostPercent,
                weak,
            ),
            &HashSet::new(),
            FitBindings::default(),
        );

        let calculator = Calculator::new(&data, &register);
        let value = calculator.get(&mut world, ship, AttributeId(1211)).unwrap().unwrap();

        let expected = 100.0 * 1.5 * (1.0 + 0.2 * crate::math::stacking_penalty(1));
        assert!((value - expected).abs() < 1e-9);
    }

    /// An attribute with `high_is_good = false` (e.g. a penalty) picks the
    /// *minimum* contribution in an assignment class, not the maximum.
    #[test]
    fn low_is_good_assign_class_picks_the_minimum() {
        let (mut world, mut data, mut register, ship) = setup();
        data.add_attribute(Attr::new(AttributeId(1212)).high_is_good(false).default_value(0.0));
        register.register_affectee(ship, AffecteeMembership::default(), FitBindings::default());

        register.register_affector(
            ship,
            ItemTypeId(1),
            Modifier::new(
                State::Offline,
                ModTgtFilter::Item,
                ModDomain::SelfDomain,
                AttributeId(1212),
                ModOperator::PreAssign,
                AttributeId(1211), // carries base value 100
            ),
            &HashSet::new(),
            FitBindings::default(),
        );
        register.register_affector(
            ship,
            ItemTypeId(1),
            Modifier::new(
                State::Offline,
                ModTgtFilter::Item,
                ModDomain::SelfDomain,
                AttributeId(1212),
                ModOperator::PreAssign,
                AttributeId(1503), // carries base value 20
            ),
            &HashSet::new(),
            FitBindings::default(),
        );

        let calculator = Calculator::new(&data, &register);
        let value = calculator.get(&mut world, ship, AttributeId(1212)).unwrap();
        assert_eq!(value, Some(20.0));
    }

    /// `max_attribute` clamps the computed value to the referenced
    /// attribute's own value, and a missing base attribute falls back to
    /// `default_value` rather than `None`.
    #[test]
    fn max_attribute_clamps_and_default_value_fills_in_a_missing_base() {
        let (mut world, mut data, mut register, ship) = setup();
        let cap = AttributeId(1213);
        let uncapped = AttributeId(1214);
        let boost = AttributeId(1215);
        data.add_attribute(Attr::new(cap).default_value(50.0));
        data.add_attribute(Attr::new(uncapped).default_value(10.0).max_attribute(cap));
        data.add_attribute(Attr::new(boost).default_value(10_000.0));
        register.register_affectee(ship, AffecteeMembership::default(), FitBindings::default());

        register.register_affector(
            ship,
            ItemTypeId(1),
            Modifier::new(
                State::Offline,
                ModTgtFilter::Item,
                ModDomain::SelfDomain,
                uncapped,
                ModOperator::PostPercent,
                boost, // +10000%, pushes uncapped (base 10) way past the cap (50)
            ),
            &HashSet::new(),
            FitBindings::default(),
        );

        let calculator = Calculator::new(&data, &register);
        assert_eq!(
            calculator.get(&mut world, ship, cap).unwrap(),
            Some(50.0)
        );
        assert_eq!(
            calculator.get(&mut world, ship, uncapped).unwrap(),
            Some(50.0)
        );
    }
}
