use crate::constants::{MAX_ATTACK_FACTOR, MIN_ATTACK_FACTOR};
use crate::rng::Rng;

/// Closed interval the attack factor is drawn from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttackRange {
    pub min: f64,
    pub max: f64,
}

impl AttackRange {
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }
}

impl Default for AttackRange {
    fn default() -> Self {
        Self::new(MIN_ATTACK_FACTOR, MAX_ATTACK_FACTOR)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Strike {
    pub factor: f64,
    pub damage: u32,
}

pub fn damage_for(attacker_health: u32, factor: f64) -> u32 {
    let raw = (f64::from(attacker_health) * factor).round();
    if raw <= 0.0 {
        0
    } else if raw >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        raw as u32
    }
}

/// Rolls one attack. Only the defender is affected by the result; the
/// attacker neither moves nor loses health.
pub fn resolve(rng: &mut Rng, attacker_health: u32, range: AttackRange) -> Strike {
    let factor = rng.range_f64(range.min, range.max);
    Strike {
        factor,
        damage: damage_for(attacker_health, factor),
    }
}
