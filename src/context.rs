//! Self-domain resolution (§9): a pure function of `(affector, current_ship,
//! current_char)`, recomputed on every ship/character swap rather than
//! cached on the modifier itself, since the same `ModDomain::SelfDomain`
//! modifier resolves differently depending on what its carrier currently is
//! bound as.

use crate::item::ItemId;
use crate::modifier::{Domain, ModDomain};

/// Resolution failure for an unresolvable domain reference (§4.1: "the
/// register raises an unexpected-domain error" when a self-domain carrier
/// is neither the current ship nor the current character).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnresolvedDomain;

/// Resolves a modifier's declared domain into an absolute [`Domain`] given
/// the carrier item and the fit's current ship/character bindings.
///
/// - `character`/`ship` resolve to themselves unconditionally — they do not
///   depend on the carrier at all.
/// - `self` resolves to whichever of ship/character the carrier currently
///   is; if the carrier is neither, resolution fails.
/// - `other` has no absolute-domain form: it is a relation through
///   [`crate::item::ItemRecord::others`], not a broadcast domain, so callers
///   must handle it before reaching this function.
pub fn resolve_domain(
    domain: ModDomain,
    carrier: ItemId,
    current_ship: Option<ItemId>,
    current_char: Option<ItemId>,
) -> Result<Domain, UnresolvedDomain> {
    match domain {
        ModDomain::Character => Ok(Domain::Character),
        ModDomain::Ship => Ok(Domain::Ship),
        ModDomain::SelfDomain => {
            if Some(carrier) == current_ship {
                Ok(Domain::Ship)
            } else if Some(carrier) == current_char {
                Ok(Domain::Character)
            } else {
                Err(UnresolvedDomain)
            }
        }
        ModDomain::Other => Err(UnresolvedDomain),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::world::World;

    fn make_id(world: &mut World) -> ItemId {
        ItemId(world.spawn_empty().id())
    }

    #[test]
    fn self_resolves_to_current_ship() {
        let mut world = World::new();
        let ship = make_id(&mut world);
        let other = make_id(&mut world);
        assert_eq!(
            resolve_domain(ModDomain::SelfDomain, ship, Some(ship), Some(other)),
            Ok(Domain::Ship)
        );
    }

    #[test]
    fn self_resolves_to_current_character() {
        let mut world = World::new();
        let character = make_id(&mut world);
        let other = make_id(&mut world);
        assert_eq!(
            resolve_domain(
                ModDomain::SelfDomain,
                character,
                Some(other),
                Some(character)
            ),
            Ok(Domain::Character)
        );
    }

    #[test]
    fn self_fails_when_carrier_is_neither() {
        let mut world = World::new();
        let carrier = make_id(&mut world);
        let ship = make_id(&mut world);
        let character = make_id(&mut world);
        assert_eq!(
            resolve_domain(ModDomain::SelfDomain, carrier, Some(ship), Some(character)),
            Err(UnresolvedDomain)
        );
    }
}
