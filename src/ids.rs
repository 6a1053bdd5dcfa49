//! Opaque identifiers for the static game data the fit is built from.
//!
//! These all wrap `u32` because the real data source (the out-of-scope
//! type/effect/attribute database) hands out small dense integer keys. They
//! are newtypes rather than bare `u32` so the register and calculator can't
//! accidentally compare, say, a group id against an attribute id.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            pub const fn new(id: u32) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(AttributeId, "Identifies an attribute definition.");
id_type!(ItemTypeId, "Identifies a `Type` in the static data source.");
id_type!(EffectId, "Identifies an `Effect` in the static data source.");
id_type!(GroupId, "Identifies the group a `Type` belongs to.");

/// Required-skill references are themselves type ids: a skill is just a
/// `Type` like any other, consumed by `domain_skillrq`/`owner_skillrq`
/// filters.
pub type SkillTypeId = ItemTypeId;
