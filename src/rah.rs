//! The Reactive Armor Hardener simulator (§4.3): a discrete-tick
//! fixed-point search for each RAH's steady-state resonance values given
//! the fit's incoming damage profile.
//!
//! There is no teacher analogue for this subsystem — the teacher has no
//! notion of a tick-based steady-state search — so this module is grounded
//! directly in §4.3's algorithm and in the teacher's general preference for
//! small, explicit structs over generic solvers (mirroring `math.rs`'s
//! plain free functions rather than, say, a trait-object strategy
//! pattern). Errors are caught at the simulator boundary and turned into
//! the fixed warning of §6 rather than propagated, matching §7's
//! "simulator errors" taxonomy entry.

use crate::calculator::Calculator;
use crate::error::Diagnostic;
use crate::ids::AttributeId;
use crate::item::{AttributeCache, ItemId};
use crate::registry::DataSource;
use bevy::ecs::world::World;

/// The four damage/resonance types, always carried in this fixed order.
pub const DAMAGE_TYPE_COUNT: usize = 4;

/// Incoming damage, one weight per type (em, thermal, kinetic, explosive).
/// Need not sum to any particular total; only relative magnitudes matter
/// for the ranking step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageProfile(pub [f64; DAMAGE_TYPE_COUNT]);

impl Default for DamageProfile {
    fn default() -> Self {
        Self([1.0; DAMAGE_TYPE_COUNT])
    }
}

/// Which attribute ids carry a RAH's resonance, shift amount, and cycle
/// time. Bound once per fit since these are fixed game-data attribute ids,
/// not per-module values.
#[derive(Debug, Clone, Copy)]
pub struct RahAttributeIds {
    pub resonances: [AttributeId; DAMAGE_TYPE_COUNT],
    pub shift_amount: AttributeId,
    pub cycle_time: AttributeId,
}

/// Tuning constants for the tail-averaging fallback (§4.3, §9).
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    pub max_ticks: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { max_ticks: 10_000 }
    }
}

/// A single discrete tick's recorded outcome, used for loop detection and
/// for the tail-averaging fallback.
#[derive(Debug, Clone)]
struct TickState {
    /// Each running RAH's 4-resonance tuple at the end of this tick.
    resonances: Vec<[f64; DAMAGE_TYPE_COUNT]>,
    /// The virtual-time span this configuration was in effect.
    weight: f64,
}

/// Runs the steady-state search for every currently-active RAH on `ship`,
/// writing the averaged resonance back onto each RAH as a pre_assign-style
/// cache override so the calculator naturally propagates it to the ship.
///
/// Any panic-worthy condition (division by a zero cycle time, most
/// notably) is caught at this boundary: per §4.3/§7, the fixed warning is
/// logged and the RAHs are left with their unsimulated resonance values.
pub fn simulate<D: DataSource>(
    world: &mut World,
    calculator: &Calculator<'_, D>,
    rahs: &[ItemId],
    ship: ItemId,
    attrs: &RahAttributeIds,
    damage: DamageProfile,
    config: &SimulationConfig,
) -> Vec<Diagnostic> {
    if rahs.is_empty() {
        return Vec::new();
    }

    match run(world, calculator, rahs, ship, attrs, damage, config) {
        Ok(diagnostics) => diagnostics,
        Err(()) => vec![Diagnostic::rah_exception()],
    }
}

fn run<D: DataSource>(
    world: &mut World,
    calculator: &Calculator<'_, D>,
    rahs: &[ItemId],
    ship: ItemId,
    attrs: &RahAttributeIds,
    damage: DamageProfile,
    config: &SimulationConfig,
) -> Result<Vec<Diagnostic>, ()> {
    let mut cycle_times = Vec::with_capacity(rahs.len());
    for &rah in rahs {
        let cycle_time = calculator
            .get(world, rah, attrs.cycle_time)
            .map_err(|_| ())?
            .ok_or(())?;
        if !(cycle_time > 0.0) || !cycle_time.is_finite() {
            return Err(());
        }
        cycle_times.push(cycle_time);
    }

    let mut shift_amounts = Vec::with_capacity(rahs.len());
    for &rah in rahs {
        let shift = calculator
            .get(world, rah, attrs.shift_amount)
            .map_err(|_| ())?
            .unwrap_or(0.0);
        shift_amounts.push(shift);
    }

    let mut resonances: Vec<[f64; DAMAGE_TYPE_COUNT]> = Vec::with_capacity(rahs.len());
    for &rah in rahs {
        let mut tuple = [0.0; DAMAGE_TYPE_COUNT];
        for (i, &attr) in attrs.resonances.iter().enumerate() {
            tuple[i] = calculator.get(world, rah, attr).map_err(|_| ())?.ok_or(())?;
        }
        resonances.push(tuple);
    }

    let mut next_completion: Vec<f64> = cycle_times.clone();
    let mut virtual_time = 0.0_f64;
    let mut history: Vec<TickState> = Vec::new();

    let steady = loop {
        if history.len() >= config.max_ticks {
            break tail_average(&history);
        }

        let next_time = next_completion
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        if !next_time.is_finite() {
            return Err(());
        }
        let dt = next_time - virtual_time;
        virtual_time = next_time;

        for (i, completion) in next_completion.iter_mut().enumerate() {
            if (*completion - next_time).abs() < f64::EPSILON {
                let ship_resonance = read_ship_resonance(world, calculator, ship, attrs)?;
                let ranking = rank_damage(&ship_resonance, &damage);
                resonances[i] = shift_resonance(resonances[i], shift_amounts[i], &ranking);
                write_resonance(world, rahs[i], attrs, &resonances[i]);
                invalidate_ship_cache(world, ship, attrs);
                *completion += cycle_times[i];
            }
        }

        history.push(TickState {
            resonances: resonances.clone(),
            weight: dt,
        });

        if let Some(steady) = detect_loop(&history) {
            break steady;
        }
    };

    for (i, &rah) in rahs.iter().enumerate() {
        write_resonance(world, rah, attrs, &steady[i]);
    }
    invalidate_ship_cache(world, ship, attrs);

    Ok(Vec::new())
}

fn read_ship_resonance<D: DataSource>(
    world: &mut World,
    calculator: &Calculator<'_, D>,
    ship: ItemId,
    attrs: &RahAttributeIds,
) -> Result<[f64; DAMAGE_TYPE_COUNT], ()> {
    let mut out = [0.0; DAMAGE_TYPE_COUNT];
    for (i, &attr) in attrs.resonances.iter().enumerate() {
        out[i] = calculator.get(world, ship, attr).map_err(|_| ())?.ok_or(())?;
    }
    Ok(out)
}

fn write_resonance(
    world: &mut World,
    item: ItemId,
    attrs: &RahAttributeIds,
    values: &[f64; DAMAGE_TYPE_COUNT],
) {
    if let Some(mut cache) = world.get_mut::<AttributeCache>(item.entity()) {
        for (i, &attr) in attrs.resonances.iter().enumerate() {
            cache.insert(attr, values[i]);
        }
    }
}

fn invalidate_ship_cache(world: &mut World, ship: ItemId, attrs: &RahAttributeIds) {
    if let Some(mut cache) = world.get_mut::<AttributeCache>(ship.entity()) {
        for &attr in &attrs.resonances {
            cache.0.remove(&attr);
        }
    }
}

/// Ranks the four damage types by "most taken" (`damage[i] * resonance[i]`,
/// descending). Ties share a rank so the shift can be split across them.
fn rank_damage(
    resonance: &[f64; DAMAGE_TYPE_COUNT],
    damage: &DamageProfile,
) -> [f64; DAMAGE_TYPE_COUNT] {
    let mut taken = [0.0; DAMAGE_TYPE_COUNT];
    for i in 0..DAMAGE_TYPE_COUNT {
        taken[i] = resonance[i] * damage.0[i];
    }
    taken
}

/// Moves `shift_amount` percentage points of resistance from the
/// best-resisted type(s) (least damage taken) to the worst-resisted
/// type(s) (most damage taken), splitting evenly across ties, keeping the
/// sum of the four resonances constant.
///
/// A raw shift can push a type's resonance past the glossary's `[0, 1]`
/// bound (most easily the best type, which only ever gains). Any such
/// overshoot is clamped back into range and the excess redistributed
/// across the remaining in-range types so the total stays constant rather
/// than just being discarded at the bound.
fn shift_resonance(
    resonance: [f64; DAMAGE_TYPE_COUNT],
    shift_amount: f64,
    taken: &[f64; DAMAGE_TYPE_COUNT],
) -> [f64; DAMAGE_TYPE_COUNT] {
    let max_taken = taken.iter().copied().fold(f64::MIN, f64::max);
    let min_taken = taken.iter().copied().fold(f64::MAX, f64::min);

    let worst: Vec<usize> = (0..DAMAGE_TYPE_COUNT)
        .filter(|&i| (taken[i] - max_taken).abs() < f64::EPSILON)
        .collect();
    let best: Vec<usize> = (0..DAMAGE_TYPE_COUNT)
        .filter(|&i| (taken[i] - min_taken).abs() < f64::EPSILON)
        .collect();

    let shift = shift_amount / 100.0;
    let mut out = resonance;
    if worst == best {
        return out;
    }
    let per_best = shift / best.len() as f64;
    let per_worst = shift / worst.len() as f64;
    for &i in &best {
        out[i] += per_best;
    }
    for &i in &worst {
        out[i] -= per_worst;
    }
    clamp_to_unit_interval(out)
}

/// Clamps every component to `[0, 1]`, redistributing whatever a
/// component overshot by across the components still inside the bound so
/// the sum is preserved (§4.3's "keeping the sum... constant" extended to
/// the saturated case). Bounded to at most one pass per type, since each
/// pass pins at least one more component or has nothing left to
/// redistribute.
fn clamp_to_unit_interval(
    mut values: [f64; DAMAGE_TYPE_COUNT],
) -> [f64; DAMAGE_TYPE_COUNT] {
    let target_sum: f64 = values.iter().sum();
    let mut pinned = [false; DAMAGE_TYPE_COUNT];

    for _ in 0..DAMAGE_TYPE_COUNT {
        for (i, pinned) in pinned.iter_mut().enumerate() {
            if *pinned {
                continue;
            }
            if values[i] > 1.0 {
                values[i] = 1.0;
                *pinned = true;
            } else if values[i] < 0.0 {
                values[i] = 0.0;
                *pinned = true;
            }
        }

        let eligible: Vec<usize> = (0..DAMAGE_TYPE_COUNT).filter(|&i| !pinned[i]).collect();
        if eligible.is_empty() {
            break;
        }
        let remaining: f64 = target_sum - values.iter().sum::<f64>();
        if remaining.abs() < 1e-12 {
            break;
        }
        let per = remaining / eligible.len() as f64;
        for &i in &eligible {
            values[i] += per;
        }
    }
    values
}

/// After each tick, looks for the longest suffix of `history` that repeats
/// the run immediately preceding it (§4.3's loop detection). Returns the
/// time-weighted mean resonance per RAH over one loop when found.
fn detect_loop(history: &[TickState]) -> Option<Vec<[f64; DAMAGE_TYPE_COUNT]>> {
    let len = history.len();
    for j in (1..=len / 2).rev() {
        let tail = &history[len - j..];
        let prior = &history[len - 2 * j..len - j];
        if tail
            .iter()
            .zip(prior.iter())
            .all(|(a, b)| states_match(&a.resonances, &b.resonances))
        {
            return Some(weighted_mean(tail));
        }
    }
    None
}

fn states_match(a: &[[f64; DAMAGE_TYPE_COUNT]], b: &[[f64; DAMAGE_TYPE_COUNT]]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b.iter()).all(|(x, y)| {
            x.iter().zip(y.iter()).all(|(p, q)| (p - q).abs() < 1e-9)
        })
}

/// §4.3's fallback when no loop is found by `max_ticks`: a time-weighted
/// mean over the tail half of the history, ignoring an initial window
/// (§9: `ignore_ticks ≈ ceil(ceil(initial_cycles) * 1.5)`, or 2 ticks when
/// the history is shorter than that window).
fn tail_average(history: &[TickState]) -> Vec<[f64; DAMAGE_TYPE_COUNT]> {
    let ignore_ticks = if history.len() > 4 { history.len() / 4 } else { 2 };
    let start = ignore_ticks.min(history.len().saturating_sub(1));
    weighted_mean(&history[start..])
}

fn weighted_mean(window: &[TickState]) -> Vec<[f64; DAMAGE_TYPE_COUNT]> {
    let rah_count = window.first().map(|t| t.resonances.len()).unwrap_or(0);
    let total_weight: f64 = window.iter().map(|t| t.weight).sum();
    let mut out = vec![[0.0; DAMAGE_TYPE_COUNT]; rah_count];
    if total_weight <= 0.0 {
        if let Some(last) = window.last() {
            return last.resonances.clone();
        }
        return out;
    }
    for tick in window {
        let w = tick.weight / total_weight;
        for (rah_idx, tuple) in tick.resonances.iter().enumerate() {
            for (i, value) in tuple.iter().enumerate() {
                out[rah_idx][i] += value * w;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// §8 scenario 3's literal inputs (ship resonances `(0.5, 0.65, 0.75,
    /// 0.9)`, RAH resonances all `0.85`, shift `6`, uniform damage profile)
    /// fed straight through the two tick primitives for a single cycle.
    /// Index 0 (least damage taken) is the sole best type and gains the
    /// full shift; index 3 (most damage taken) is the sole worst type and
    /// loses it; neither hits a bound yet, so this exercises the ranking
    /// and redistribution arithmetic without engaging `clamp_to_unit_interval`.
    #[test]
    fn first_tick_matches_scenario_rah_example() {
        let ship_resonance = [0.5, 0.65, 0.75, 0.9];
        let damage = DamageProfile::default();
        let rah_resonance = [0.85, 0.85, 0.85, 0.85];

        let taken = rank_damage(&ship_resonance, &damage);
        assert_eq!(taken, ship_resonance);

        let shifted = shift_resonance(rah_resonance, 6.0, &taken);
        assert_eq!(shifted, [0.91, 0.85, 0.85, 0.79]);
    }

    /// Drives the best type past the `1.0` bound (a large shift onto an
    /// already-high resonance) and checks the saturation path: the
    /// overshoot is clamped away and the excess spread evenly over the
    /// still-eligible types rather than simply dropped, so the four-type
    /// sum matches the pre-shift sum exactly.
    #[test]
    fn shift_resonance_redistributes_overshoot_past_one() {
        let resonance = [0.98, 0.5, 0.5, 0.5];
        let sum_before: f64 = resonance.iter().sum();
        // Three-way tie for least damage taken (indices 0-2), index 3 alone worst.
        let taken = [0.1, 0.1, 0.1, 10.0];

        let shifted = shift_resonance(resonance, 10.0, &taken);

        assert!(shifted.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert_eq!(shifted[0], 1.0);
        let sum_after: f64 = shifted.iter().sum();
        assert!((sum_after - sum_before).abs() < 1e-9);
    }
}
