//! The Affection Register (§4.1): the eight indices plus membership set
//! that answer "which affectors currently apply to item X" and its
//! inverse.
//!
//! Grounded in the teacher's `graph.rs`, which keeps a single
//! `petgraph::StableGraph` of entity/effect/modifier nodes and walks it at
//! query time. That shape doesn't fit here: §4.1 calls for named,
//! independently-invalidatable indices rather than one graph walked fresh
//! per query, and a graph would force us to re-derive "is this affector
//! active, awaitable, or an other-domain peer record" from edge topology
//! on every read instead of tracking it directly. The indices below are a
//! direct transcription of §4.1's table; the state machine in §9
//! (Unregistered/Awaitable/Active, with "other" affectors living in both
//! `other` and `active` at once) drives the promote/demote methods.
//!
//! The register holds no reference to the fit's [`bevy::ecs::world::World`]
//! or type database — callers (the [`crate::fit::Fit`]) resolve an item's
//! domain/group/skill membership once and pass it in as an
//! [`AffecteeMembership`], keeping this module's logic testable on its own.

use crate::context::resolve_domain;
use crate::error::Diagnostic;
use crate::ids::{GroupId, ItemTypeId, SkillTypeId};
use crate::item::ItemId;
use crate::modifier::{Domain, FilterArg, ModDomain, ModTgtFilter, Modifier};
use std::collections::{HashMap, HashSet};

/// A `(carrier_item, modifier)` pair currently capable of modifying
/// something (§3 glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Affector {
    pub carrier: ItemId,
    pub modifier: Modifier,
}

/// The affectee-side facts the register needs about an item: which
/// absolute domain it occupies (if any), its group, the skills it
/// requires, whether it is owner-modifiable, and its `other`-relation
/// peers. Computed by the caller from [`crate::item::ItemRecord`] and the
/// item's [`crate::type_def::ItemTypeDef`].
#[derive(Debug, Clone, Default)]
pub struct AffecteeMembership {
    pub domain: Option<Domain>,
    pub group: Option<GroupId>,
    pub required_skills: Vec<SkillTypeId>,
    pub owner_modifiable: bool,
    pub others: HashSet<ItemId>,
}

/// The fit's current ship/character bindings, passed to every register
/// call that needs to resolve a `self` domain or an item-filter
/// ship/character target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FitBindings {
    pub current_ship: Option<ItemId>,
    pub current_char: Option<ItemId>,
}

/// Which concrete item an item-filter modifier resolves to, before we know
/// whether that item is actually registered yet. Derived purely from the
/// modifier's declared domain — no self-resolution (§9) is needed for the
/// `item` filter, since `self` there already means "the carrier itself",
/// not "whichever of ship/character the carrier currently is".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetKind {
    Carrier,
    CurrentShip,
    CurrentChar,
}

fn target_kind_of(domain: ModDomain) -> Option<TargetKind> {
    match domain {
        ModDomain::SelfDomain => Some(TargetKind::Carrier),
        ModDomain::Character => Some(TargetKind::CurrentChar),
        ModDomain::Ship => Some(TargetKind::CurrentShip),
        ModDomain::Other => None,
    }
}

#[derive(Debug, Default)]
pub struct AffectionRegister {
    affectee: HashSet<ItemId>,
    affectee_membership: HashMap<ItemId, AffecteeMembership>,
    affectee_domain: HashMap<Domain, HashSet<ItemId>>,
    affectee_domain_group: HashMap<(Domain, GroupId), HashSet<ItemId>>,
    affectee_domain_skillrq: HashMap<(Domain, SkillTypeId), HashSet<ItemId>>,
    affectee_owner_skillrq: HashMap<SkillTypeId, HashSet<ItemId>>,

    affector_item_active: HashMap<ItemId, HashSet<Affector>>,
    affector_item_awaitable: HashMap<ItemId, HashSet<Affector>>,
    affector_item_other: HashMap<ItemId, HashSet<Affector>>,

    affector_domain: HashMap<Domain, HashSet<Affector>>,
    affector_domain_group: HashMap<(Domain, GroupId), HashSet<Affector>>,
    affector_domain_skillrq: HashMap<(Domain, SkillTypeId), HashSet<Affector>>,
    affector_owner_skillrq: HashMap<SkillTypeId, HashSet<Affector>>,
}

impl AffectionRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self, item: ItemId) -> bool {
        self.affectee.contains(&item)
    }

    /// Registers an affectee: inserts it into every applicable affectee
    /// index, then promotes any awaitable/`other` affectors that were
    /// waiting on it (§4.1).
    pub fn register_affectee(
        &mut self,
        item: ItemId,
        membership: AffecteeMembership,
        bindings: FitBindings,
    ) {
        self.affectee.insert(item);
        if let Some(domain) = membership.domain {
            self.affectee_domain.entry(domain).or_default().insert(item);
            if let Some(group) = membership.group {
                self.affectee_domain_group
                    .entry((domain, group))
                    .or_default()
                    .insert(item);
            }
            for skill in &membership.required_skills {
                self.affectee_domain_skillrq
                    .entry((domain, *skill))
                    .or_default()
                    .insert(item);
            }
        }
        if membership.owner_modifiable {
            for skill in &membership.required_skills {
                self.affectee_owner_skillrq
                    .entry(*skill)
                    .or_default()
                    .insert(item);
            }
        }

        self.promote_awaitable_targeting(item, bindings);

        for peer in &membership.others {
            if let Some(others_affectors) = self.affector_item_other.get(peer) {
                let replicated: Vec<Affector> = others_affectors.iter().copied().collect();
                let active = self.affector_item_active.entry(item).or_default();
                active.extend(replicated);
            }
        }

        self.affectee_membership.insert(item, membership);
    }

    /// Unregisters an affectee: removes it from affectee indices, deletes
    /// direct affectors targeting it, and demotes the ones whose domain is
    /// self/character/ship back into the awaitable index (§4.1). Affectors
    /// with domain=other are simply dropped from the active set; their
    /// permanent record in `affector_item_other` is untouched.
    pub fn unregister_affectee(&mut self, item: ItemId) {
        self.affectee.remove(&item);
        if let Some(membership) = self.affectee_membership.remove(&item) {
            if let Some(domain) = membership.domain {
                if let Some(set) = self.affectee_domain.get_mut(&domain) {
                    set.remove(&item);
                }
                if let Some(group) = membership.group {
                    if let Some(set) = self.affectee_domain_group.get_mut(&(domain, group)) {
                        set.remove(&item);
                    }
                }
                for skill in &membership.required_skills {
                    if let Some(set) = self.affectee_domain_skillrq.get_mut(&(domain, *skill)) {
                        set.remove(&item);
                    }
                }
            }
            if membership.owner_modifiable {
                for skill in &membership.required_skills {
                    if let Some(set) = self.affectee_owner_skillrq.get_mut(skill) {
                        set.remove(&item);
                    }
                }
            }
        }

        if let Some(active) = self.affector_item_active.remove(&item) {
            for affector in active {
                if target_kind_of(affector.modifier.tgt_domain).is_some() {
                    self.affector_item_awaitable
                        .entry(affector.carrier)
                        .or_default()
                        .insert(affector);
                }
            }
        }
    }

    /// Registers an affector into the index selected by its `tgt_filter`
    /// (§4.1). Returns any diagnostics produced by a malformed domain or
    /// filter argument; the affector is dropped (not indexed) in that case,
    /// per §7's data-error policy.
    pub fn register_affector(
        &mut self,
        carrier: ItemId,
        carrier_type_id: ItemTypeId,
        modifier: Modifier,
        carrier_others: &HashSet<ItemId>,
        bindings: FitBindings,
    ) -> Vec<Diagnostic> {
        let affector = Affector { carrier, modifier };
        let mut diagnostics = Vec::new();

        match modifier.tgt_filter {
            ModTgtFilter::Item => match modifier.tgt_domain {
                ModDomain::Other => {
                    self.affector_item_other
                        .entry(carrier)
                        .or_default()
                        .insert(affector);
                    for peer in carrier_others {
                        if self.affectee.contains(peer) {
                            self.affector_item_active
                                .entry(*peer)
                                .or_default()
                                .insert(affector);
                        }
                    }
                }
                ModDomain::SelfDomain | ModDomain::Character | ModDomain::Ship => {
                    let target = match modifier.tgt_domain {
                        ModDomain::SelfDomain => Some(carrier),
                        ModDomain::Character => bindings.current_char,
                        ModDomain::Ship => bindings.current_ship,
                        ModDomain::Other => unreachable!(),
                    };
                    match target {
                        Some(t) if self.affectee.contains(&t) => {
                            self.affector_item_active.entry(t).or_default().insert(affector);
                        }
                        _ => {
                            self.affector_item_awaitable
                                .entry(carrier)
                                .or_default()
                                .insert(affector);
                        }
                    }
                }
            },
            ModTgtFilter::Domain => {
                match resolve_domain(
                    modifier.tgt_domain,
                    carrier,
                    bindings.current_ship,
                    bindings.current_char,
                ) {
                    Ok(domain) => {
                        self.affector_domain.entry(domain).or_default().insert(affector);
                    }
                    Err(_) => diagnostics.push(Diagnostic::malformed_domain(
                        carrier_type_id,
                        modifier.tgt_domain,
                    )),
                }
            }
            ModTgtFilter::DomainGroup => {
                match resolve_domain(
                    modifier.tgt_domain,
                    carrier,
                    bindings.current_ship,
                    bindings.current_char,
                ) {
                    Ok(domain) => match modifier.tgt_filter_extra_arg {
                        Some(FilterArg::Group(group)) => {
                            self.affector_domain_group
                                .entry((domain, group))
                                .or_default()
                                .insert(affector);
                        }
                        _ => diagnostics
                            .push(Diagnostic::malformed_filter(carrier_type_id, modifier.tgt_filter)),
                    },
                    Err(_) => diagnostics.push(Diagnostic::malformed_domain(
                        carrier_type_id,
                        modifier.tgt_domain,
                    )),
                }
            }
            ModTgtFilter::DomainSkillrq => {
                match resolve_domain(
                    modifier.tgt_domain,
                    carrier,
                    bindings.current_ship,
                    bindings.current_char,
                ) {
                    Ok(domain) => match modifier.tgt_filter_extra_arg {
                        Some(FilterArg::Skill(skill)) => {
                            self.affector_domain_skillrq
                                .entry((domain, skill))
                                .or_default()
                                .insert(affector);
                        }
                        _ => diagnostics
                            .push(Diagnostic::malformed_filter(carrier_type_id, modifier.tgt_filter)),
                    },
                    Err(_) => diagnostics.push(Diagnostic::malformed_domain(
                        carrier_type_id,
                        modifier.tgt_domain,
                    )),
                }
            }
            ModTgtFilter::OwnerSkillrq => match modifier.tgt_filter_extra_arg {
                Some(FilterArg::Skill(skill)) => {
                    self.affector_owner_skillrq.entry(skill).or_default().insert(affector);
                }
                _ => diagnostics
                    .push(Diagnostic::malformed_filter(carrier_type_id, modifier.tgt_filter)),
            },
        }

        diagnostics
    }

    /// Removes a previously-registered affector. Mirrors
    /// [`Self::register_affector`]'s placement logic; a rebind may have
    /// moved an item-filter affector between the active and awaitable
    /// indices since registration, so both are checked.
    pub fn unregister_affector(
        &mut self,
        carrier: ItemId,
        modifier: Modifier,
        carrier_others: &HashSet<ItemId>,
        bindings: FitBindings,
    ) {
        let affector = Affector { carrier, modifier };
        match modifier.tgt_filter {
            ModTgtFilter::Item => match modifier.tgt_domain {
                ModDomain::Other => {
                    if let Some(set) = self.affector_item_other.get_mut(&carrier) {
                        set.remove(&affector);
                    }
                    for peer in carrier_others {
                        if let Some(set) = self.affector_item_active.get_mut(peer) {
                            set.remove(&affector);
                        }
                    }
                }
                _ => {
                    if let Some(set) = self.affector_item_awaitable.get_mut(&carrier) {
                        set.remove(&affector);
                    }
                    for target in [Some(carrier), bindings.current_ship, bindings.current_char]
                        .into_iter()
                        .flatten()
                    {
                        if let Some(set) = self.affector_item_active.get_mut(&target) {
                            set.remove(&affector);
                        }
                    }
                }
            },
            ModTgtFilter::Domain => {
                if let Ok(domain) = resolve_domain(
                    modifier.tgt_domain,
                    carrier,
                    bindings.current_ship,
                    bindings.current_char,
                ) {
                    if let Some(set) = self.affector_domain.get_mut(&domain) {
                        set.remove(&affector);
                    }
                }
            }
            ModTgtFilter::DomainGroup => {
                if let (
                    Ok(domain),
                    Some(FilterArg::Group(group)),
                ) = (
                    resolve_domain(
                        modifier.tgt_domain,
                        carrier,
                        bindings.current_ship,
                        bindings.current_char,
                    ),
                    modifier.tgt_filter_extra_arg,
                ) {
                    if let Some(set) = self.affector_domain_group.get_mut(&(domain, group)) {
                        set.remove(&affector);
                    }
                }
            }
            ModTgtFilter::DomainSkillrq => {
                if let (
                    Ok(domain),
                    Some(FilterArg::Skill(skill)),
                ) = (
                    resolve_domain(
                        modifier.tgt_domain,
                        carrier,
                        bindings.current_ship,
                        bindings.current_char,
                    ),
                    modifier.tgt_filter_extra_arg,
                ) {
                    if let Some(set) = self.affector_domain_skillrq.get_mut(&(domain, skill)) {
                        set.remove(&affector);
                    }
                }
            }
            ModTgtFilter::OwnerSkillrq => {
                if let Some(FilterArg::Skill(skill)) = modifier.tgt_filter_extra_arg {
                    if let Some(set) = self.affector_owner_skillrq.get_mut(&skill) {
                        set.remove(&affector);
                    }
                }
            }
        }
    }

    /// Re-evaluates awaitable↔active transitions after the fit's ship
    /// and/or character binding changes (§9). Affectors resolved against
    /// the previous binding are demoted back to awaitable; affectors
    /// awaiting the new binding (if registered) are promoted.
    pub fn rebind(&mut self, old: FitBindings, new: FitBindings) {
        if old.current_ship != new.current_ship {
            if let Some(prev_ship) = old.current_ship {
                self.demote_active_kind(prev_ship, TargetKind::CurrentShip);
            }
        }
        if old.current_char != new.current_char {
            if let Some(prev_char) = old.current_char {
                self.demote_active_kind(prev_char, TargetKind::CurrentChar);
            }
        }
        if let Some(ship) = new.current_ship {
            self.promote_awaitable_targeting(ship, new);
        }
        if let Some(character) = new.current_char {
            self.promote_awaitable_targeting(character, new);
        }
    }

    fn demote_active_kind(&mut self, item: ItemId, kind: TargetKind) {
        if let Some(active) = self.affector_item_active.get_mut(&item) {
            let mut demote = Vec::new();
            active.retain(|affector| {
                if target_kind_of(affector.modifier.tgt_domain) == Some(kind) {
                    demote.push(*affector);
                    false
                } else {
                    true
                }
            });
            for affector in demote {
                self.affector_item_awaitable
                    .entry(affector.carrier)
                    .or_default()
                    .insert(affector);
            }
        }
    }

    fn promote_awaitable_targeting(&mut self, item: ItemId, bindings: FitBindings) {
        if let Some(entries) = self.affector_item_awaitable.remove(&item) {
            let mut keep = HashSet::new();
            let mut promote = Vec::new();
            for affector in entries {
                if target_kind_of(affector.modifier.tgt_domain) == Some(TargetKind::Carrier) {
                    promote.push(affector);
                } else {
                    keep.insert(affector);
                }
            }
            if !keep.is_empty() {
                self.affector_item_awaitable.insert(item, keep);
            }
            let active = self.affector_item_active.entry(item).or_default();
            active.extend(promote);
        }

        let targets_ship = bindings.current_ship == Some(item);
        let targets_char = bindings.current_char == Some(item);
        if !targets_ship && !targets_char {
            return;
        }

        let mut promoted = Vec::new();
        for entries in self.affector_item_awaitable.values_mut() {
            entries.retain(|affector| {
                let kind = target_kind_of(affector.modifier.tgt_domain);
                let matches = (targets_ship && kind == Some(TargetKind::CurrentShip))
                    || (targets_char && kind == Some(TargetKind::CurrentChar));
                if matches {
                    promoted.push(*affector);
                }
                !matches
            });
        }
        let active = self.affector_item_active.entry(item).or_default();
        active.extend(promoted);
    }

    /// The set of affectors currently applicable to `item` (§4.1's
    /// `get_affectors` contract): the direct active set unioned with every
    /// broadcast index `item`'s membership falls into.
    pub fn get_affectors(&self, item: ItemId) -> HashSet<Affector> {
        let mut result = HashSet::new();
        if let Some(active) = self.affector_item_active.get(&item) {
            result.extend(active.iter().copied());
        }
        if let Some(membership) = self.affectee_membership.get(&item) {
            if let Some(domain) = membership.domain {
                if let Some(set) = self.affector_domain.get(&domain) {
                    result.extend(set.iter().copied());
                }
                if let Some(group) = membership.group {
                    if let Some(set) = self.affector_domain_group.get(&(domain, group)) {
                        result.extend(set.iter().copied());
                    }
                }
                for skill in &membership.required_skills {
                    if let Some(set) = self.affector_domain_skillrq.get(&(domain, *skill)) {
                        result.extend(set.iter().copied());
                    }
                }
            }
            if membership.owner_modifiable {
                for skill in &membership.required_skills {
                    if let Some(set) = self.affector_owner_skillrq.get(skill) {
                        result.extend(set.iter().copied());
                    }
                }
            }
        }
        result
    }

    /// The set of items a given affector currently applies to — the
    /// symmetric lookup of [`Self::get_affectors`].
    pub fn get_affectees(&self, affector: Affector) -> HashSet<ItemId> {
        let mut result = HashSet::new();
        for (item, set) in &self.affector_item_active {
            if set.contains(&affector) {
                result.insert(*item);
            }
        }
        match affector.modifier.tgt_filter {
            ModTgtFilter::Item => {}
            ModTgtFilter::Domain => {
                for (domain, set) in &self.affector_domain {
                    if set.contains(&affector) {
                        if let Some(items) = self.affectee_domain.get(domain) {
                            result.extend(items.iter().copied());
                        }
                    }
                }
            }
            ModTgtFilter::DomainGroup => {
                for (key, set) in &self.affector_domain_group {
                    if set.contains(&affector) {
                        if let Some(items) = self.affectee_domain_group.get(key) {
                            result.extend(items.iter().copied());
                        }
                    }
                }
            }
            ModTgtFilter::DomainSkillrq => {
                for (key, set) in &self.affector_domain_skillrq {
                    if set.contains(&affector) {
                        if let Some(items) = self.affectee_domain_skillrq.get(key) {
                            result.extend(items.iter().copied());
                        }
                    }
                }
            }
            ModTgtFilter::OwnerSkillrq => {
                for (skill, set) in &self.affector_owner_skillrq {
                    if set.contains(&affector) {
                        if let Some(items) = self.affectee_owner_skillrq.get(skill) {
                            result.extend(items.iter().copied());
                        }
                    }
                }
            }
        }
        result
    }
}
