//! Attribute calculation core for a spaceship-fitting simulator: the
//! Affection Register, the Attribute Calculator, and the Reactive Armor
//! Hardener simulator, tied together behind a single [`Fit`] handle.
//!
//! Control flow is synchronous and caller-driven throughout — there are no
//! threads, no timers, and no background schedule. The only external
//! collaborator is a [`DataSource`](registry::DataSource): a read-only
//! lookup for type/effect/attribute descriptors that this crate never
//! constructs or mutates itself.

pub mod attribute;
pub mod calculator;
pub mod context;
pub mod effect;
pub mod error;
pub mod fit;
pub mod ids;
pub mod item;
pub mod math;
pub mod modifier;
pub mod rah;
pub mod register;
pub mod registry;
pub mod type_def;

pub mod prelude {
    pub use crate::attribute::{AttributeDataSource, AttributeDef};
    pub use crate::effect::{Effect, EffectCategory, EffectDataSource};
    pub use crate::error::{AttributeMetadataError, Diagnostic};
    pub use crate::fit::{Fit, RahConfig};
    pub use crate::ids::{AttributeId, EffectId, GroupId, ItemTypeId, SkillTypeId};
    pub use crate::item::ItemId;
    pub use crate::modifier::{
        Domain, FilterArg, ModDomain, ModOperator, ModTgtFilter, Modifier, State,
    };
    pub use crate::rah::{DamageProfile, RahAttributeIds, SimulationConfig};
    pub use crate::registry::{DataRegistry, DataSource};
    pub use crate::type_def::{ItemTypeDef, TypeDataSource};
}
