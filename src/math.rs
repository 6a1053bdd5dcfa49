//! Small numeric helpers shared by the calculator and the RAH simulator.
//!
//! The teacher keeps this kind of thing in its own `math.rs`. We keep the
//! same home for the stacking-penalty formula, a pure numeric rule the
//! calculator leans on repeatedly.

/// Base of the stacking-penalty exponent (§4.2, glossary "Stacking penalty").
const PENALTY_BASE: f64 = 2.22;

/// `0.5^(i^2 / 2.22^2)`, the diminishing-returns factor applied to the
/// `i`-th (0-indexed) contribution of a non-stackable attribute within an
/// operator class.
pub fn stacking_penalty(i: usize) -> f64 {
    let i = i as f64;
    0.5_f64.powf((i * i) / (PENALTY_BASE * PENALTY_BASE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalty_at_zero_is_unpenalized() {
        assert_eq!(stacking_penalty(0), 1.0);
    }

    #[test]
    fn penalty_decreases_with_index() {
        let p0 = stacking_penalty(0);
        let p1 = stacking_penalty(1);
        let p2 = stacking_penalty(2);
        assert!(p0 > p1);
        assert!(p1 > p2);
    }
}
