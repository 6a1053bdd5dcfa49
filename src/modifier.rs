//! The modifier vocabulary: states, domains, filters and operators (§3, §6).

use crate::ids::{AttributeId, GroupId, ItemTypeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `offline=0 < online=1 < active=2 < overload=3`. Doubles as both an
/// item's current state and a modifier's activation threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum State {
    Offline = 0,
    Online = 1,
    Active = 2,
    Overload = 3,
}

/// The domain a modifier is declared against, before self-resolution.
/// `SelfDomain` is resolved to `Ship` or `Character` by [`crate::context`]
/// depending on what the carrier currently is in the fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModDomain {
    SelfDomain,
    Character,
    Ship,
    Other,
}

impl fmt::Display for ModDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModDomain::SelfDomain => "self",
            ModDomain::Character => "character",
            ModDomain::Ship => "ship",
            ModDomain::Other => "other",
        };
        f.write_str(s)
    }
}

/// An absolute domain, i.e. one a `self` reference has already been
/// resolved into. Items place themselves into at most one of these via
/// `Item::modifier_domain`; "other" is a relation, not a domain an item
/// occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Character,
    Ship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModTgtFilter {
    Item,
    Domain,
    DomainGroup,
    DomainSkillrq,
    OwnerSkillrq,
}

impl fmt::Display for ModTgtFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModTgtFilter::Item => "item",
            ModTgtFilter::Domain => "domain",
            ModTgtFilter::DomainGroup => "domain_group",
            ModTgtFilter::DomainSkillrq => "domain_skillrq",
            ModTgtFilter::OwnerSkillrq => "owner_skillrq",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModOperator {
    PreAssign,
    PreMul,
    PreDiv,
    ModAdd,
    ModSub,
    PostMul,
    PostDiv,
    PostPercent,
    PostAssign,
}

/// Which bucket of §4.2's operator pipeline a given operator belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorClass {
    PreAssign,
    PreMul,
    Add,
    PostMul,
    PostAssign,
}

impl ModOperator {
    pub fn class(self) -> OperatorClass {
        match self {
            ModOperator::PreAssign => OperatorClass::PreAssign,
            ModOperator::PreMul | ModOperator::PreDiv => OperatorClass::PreMul,
            ModOperator::ModAdd | ModOperator::ModSub => OperatorClass::Add,
            ModOperator::PostMul | ModOperator::PostDiv | ModOperator::PostPercent => {
                OperatorClass::PostMul
            }
            ModOperator::PostAssign => OperatorClass::PostAssign,
        }
    }
}

impl OperatorClass {
    /// Assignment classes take exactly one value; the rest apply a
    /// stacking penalty across however many contributions there are.
    pub fn is_assignment(self) -> bool {
        matches!(self, OperatorClass::PreAssign | OperatorClass::PostAssign)
    }
}

/// Extra argument a filter needs to narrow its broadcast: a group id for
/// `domain_group`, a skill type id for `domain_skillrq`/`owner_skillrq`. The
/// `CurrentSelf` sentinel (§3) is resolved at modifier-build time by
/// substituting the carrier's own type id, so by the time a [`Modifier`]
/// reaches the register it is already a concrete id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterArg {
    Group(GroupId),
    Skill(ItemTypeId),
}

/// An immutable `(state, tgt_filter, tgt_domain, tgt_attr,
/// tgt_filter_extra_arg, operator, src_attr)` tuple (§3). Intentionally
/// `Copy`: modifiers carry no owned data, so affectors can hold them by
/// value instead of by reference, sidestepping the lifetime questions a
/// register indexing into shared `Effect` data would otherwise raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifier {
    pub state: State,
    pub tgt_filter: ModTgtFilter,
    pub tgt_domain: ModDomain,
    pub tgt_attr: AttributeId,
    pub tgt_filter_extra_arg: Option<FilterArg>,
    pub operator: ModOperator,
    pub src_attr: AttributeId,
}

impl Modifier {
    pub fn new(
        state: State,
        tgt_filter: ModTgtFilter,
        tgt_domain: ModDomain,
        tgt_attr: AttributeId,
        operator: ModOperator,
        src_attr: AttributeId,
    ) -> Self {
        Self {
            state,
            tgt_filter,
            tgt_domain,
            tgt_attr,
            tgt_filter_extra_arg: None,
            operator,
            src_attr,
        }
    }

    pub fn with_extra_arg(mut self, arg: FilterArg) -> Self {
        self.tgt_filter_extra_arg = Some(arg);
        self
    }
}
