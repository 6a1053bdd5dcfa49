//! RAH trigger-condition and error-path coverage for §4.3/§8's scenarios 4
//! and 5. Scenario 3's single-tick arithmetic (its literal ship/RAH
//! resonance inputs run through `rank_damage`/`shift_resonance`, including
//! the saturating redistribution when a shift would push a type past
//! `[0, 1]`) is covered by `rah::tests` instead — hand-verifying that
//! primitive math is tractable, but hand-verifying the full multi-tick
//! convergence to the scenario's steady state is not, so it isn't asserted
//! anywhere in this repository. These integration tests instead pin down
//! the two RAH behaviors that don't depend on that convergence: the
//! exception boundary and the "not a RAH at all" short-circuit.

use resonant_fit::prelude::*;

const EM: AttributeId = AttributeId(1);
const THERMAL: AttributeId = AttributeId(2);
const KINETIC: AttributeId = AttributeId(3);
const EXPLOSIVE: AttributeId = AttributeId(4);
const SHIFT: AttributeId = AttributeId(5);
const CYCLE_TIME: AttributeId = AttributeId(6);
const RAH_EFFECT: EffectId = EffectId(1);
const RAH_TYPE: ItemTypeId = ItemTypeId(1);
const SHIP_TYPE: ItemTypeId = ItemTypeId(2);

fn rah_attribute_ids() -> RahAttributeIds {
    RahAttributeIds {
        resonances: [EM, THERMAL, KINETIC, EXPLOSIVE],
        shift_amount: SHIFT,
        cycle_time: CYCLE_TIME,
    }
}

fn base_data(cycle_time: f64, default_effect: Option<EffectId>) -> DataRegistry {
    let mut data = DataRegistry::new();
    for attr in [EM, THERMAL, KINETIC, EXPLOSIVE, SHIFT, CYCLE_TIME] {
        data.add_attribute(AttributeDef::new(attr));
    }

    let (status, effect) = Effect::build(RAH_EFFECT, EffectCategory::Passive, None, vec![]);
    assert_eq!(status, resonant_fit::effect::BuildStatus::Ok);
    data.add_effect(effect.unwrap());

    let mut rah = ItemTypeDef::new(RAH_TYPE, GroupId(1))
        .with_base_attr(EM, 0.85)
        .with_base_attr(THERMAL, 0.85)
        .with_base_attr(KINETIC, 0.85)
        .with_base_attr(EXPLOSIVE, 0.85)
        .with_base_attr(SHIFT, 6.0)
        .with_base_attr(CYCLE_TIME, cycle_time);
    if let Some(effect_id) = default_effect {
        rah = rah.with_default_effect(effect_id);
    }
    data.add_type(rah);

    let ship = ItemTypeDef::new(SHIP_TYPE, GroupId(1));
    data.add_type(ship);

    data
}

#[test]
fn cycle_time_zero_triggers_exception_and_keeps_base_resonances() {
    let data = base_data(0.0, Some(RAH_EFFECT));
    let mut fit = Fit::new(data).with_rah_config(RahConfig {
        effect_id: RAH_EFFECT,
        attribute_ids: rah_attribute_ids(),
        simulation: SimulationConfig::default(),
    });

    let ship = fit.add_item(SHIP_TYPE);
    fit.set_ship(Some(ship));
    let rah = fit.add_item(RAH_TYPE);
    fit.set_state(rah, State::Active);

    let value = fit.get_attribute(rah, EM).unwrap();
    assert_eq!(value, Some(0.85));

    let warnings: Vec<_> = fit
        .diagnostics()
        .iter()
        .filter(|d| d.message == "unexpected exception, setting unsimulated resonances")
        .collect();
    assert_eq!(warnings.len(), 1);
}

#[test]
fn clearing_default_effect_disqualifies_a_rah() {
    let data = base_data(1000.0, None);
    let mut fit = Fit::new(data).with_rah_config(RahConfig {
        effect_id: RAH_EFFECT,
        attribute_ids: rah_attribute_ids(),
        simulation: SimulationConfig::default(),
    });

    let ship = fit.add_item(SHIP_TYPE);
    fit.set_ship(Some(ship));
    let module = fit.add_item(RAH_TYPE);
    fit.set_state(module, State::Active);

    let value = fit.get_attribute(module, EM).unwrap();
    assert_eq!(value, Some(0.85));
    assert!(fit.diagnostics().is_empty());
}
