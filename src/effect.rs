//! Effects: the container that groups modifiers and assigns them their
//! activation semantics (§3, §6).
//!
//! The teacher's `EffectBuilder` (`effect/builder.rs`) assembles an
//! `EffectDef` from a fluent chain of `.modify()`/`.attach_if()` calls
//! backed by a runtime expression tree (`express_it::Expr`). Our modifiers
//! are flat data (a single `src_attr`, not an expression), so there is no
//! expression compiler to carry over — the builder here only needs to
//! validate the category and hand back modifiers unchanged, matching the
//! "never raise to the caller during build" rule in §9's design notes.

use crate::ids::{AttributeId, EffectId};
use crate::modifier::{Modifier, State};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectCategory {
    Passive = 0,
    Active = 1,
    Target = 2,
    Area = 3,
    Online = 4,
    Overload = 5,
    Dungeon = 6,
    System = 7,
}

/// Whether a category's modifiers apply to the carrier itself or are
/// projected onto something else (e.g. a target-category effect projected
/// by a weapon). Not load-bearing for the calculator today, but part of
/// the stable category contract in §6's table and worth keeping explicit
/// rather than re-deriving ad hoc at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectContext {
    Local,
    Projected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Ok,
    Error,
}

/// §6's category → (minimum state, context) table. `Area` and `Dungeon`
/// have no minimum state: they are rejected outright.
pub fn category_context(category: EffectCategory) -> Result<(State, EffectContext), ()> {
    use EffectCategory::*;
    match category {
        Passive => Ok((State::Offline, EffectContext::Local)),
        Active => Ok((State::Active, EffectContext::Local)),
        Target => Ok((State::Active, EffectContext::Projected)),
        Online => Ok((State::Online, EffectContext::Local)),
        Overload => Ok((State::Overload, EffectContext::Local)),
        System => Ok((State::Offline, EffectContext::Local)),
        Area | Dungeon => Err(()),
    }
}

/// An immutable effect descriptor (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Effect {
    pub effect_id: EffectId,
    pub category: EffectCategory,
    pub duration_attr: Option<AttributeId>,
    pub modifiers: Vec<Modifier>,
}

impl Effect {
    /// Validates the category per §6/§7 and returns either the built
    /// effect or a rejection status; never panics on malformed input,
    /// matching the "must never raise to the caller during build" rule.
    pub fn build(
        effect_id: EffectId,
        category: EffectCategory,
        duration_attr: Option<AttributeId>,
        modifiers: Vec<Modifier>,
    ) -> (BuildStatus, Option<Effect>) {
        if category_context(category).is_err() {
            return (BuildStatus::Error, None);
        }
        (
            BuildStatus::Ok,
            Some(Effect {
                effect_id,
                category,
                duration_attr,
                modifiers,
            }),
        )
    }

    /// Whether any of this effect's modifiers are active given an item's
    /// current state. Each modifier carries its own threshold (§3), so an
    /// effect can be "partially active" — this is a convenience used by
    /// diagnostics/tests, not by the register, which checks per-modifier.
    pub fn has_active_modifier(&self, state: State) -> bool {
        self.modifiers.iter().any(|m| state >= m.state)
    }
}

/// Read-only lookup for effect descriptors, keyed by [`EffectId`].
pub trait EffectDataSource {
    fn effect(&self, effect_id: EffectId) -> Option<&Effect>;
}
