//! Proof-of-work helpers: target-boundary checks and difficulty retargeting.
//!
//! The teacher crate's original scheme was leading-zero-bit counting; §9's
//! open questions call for a proper target-value representation so difficulty
//! can be retargeted smoothly. [`Target`] (primitives) carries the boundary;
//! this module carries the policy (genesis target derivation, retargeting).
//! Mining the nonce itself is out of scope (§1 Deliberately excluded) except
//! for the deterministic test helper below.

use crate::primitives::{Hash, Target};

/// Derives a genesis target from a leading-zero-bit count, matching the
/// teacher crate's original difficulty knob (`ConsensusConfig::num_zeros_at_least_in_hash`)
/// while storing/comparing against the proper compact target representation.
pub fn target_from_zero_bits(num_zeros: u32) -> Target {
    let num_zeros = num_zeros.min(255);
    let boundary = if num_zeros == 0 {
        primitive_types::U256::max_value()
    } else {
        primitive_types::U256::max_value() >> num_zeros
    };
    Target::compact(boundary)
}

pub fn hash_meets_target(hash: &Hash, target: &Target) -> bool {
    target.hash_meets_target(hash)
}

/// Retargets `current` given the actual time taken to mine the last
/// `interval` blocks versus the expected time, clamped to a 4x band in
/// either direction (matching the conventional PoW retarget guard so a
/// single pathological sample can't swing difficulty wildly).
pub fn retarget(current: Target, actual_timespan_ms: u64, expected_timespan_ms: u64) -> Target {
    let actual = actual_timespan_ms.clamp(expected_timespan_ms / 4, expected_timespan_ms * 4);
    let expanded = current.expand();
    // Divide before multiplying to avoid overflowing 256 bits; this loses a
    // little precision versus a 512-bit intermediate, which is acceptable for
    // a difficulty knob that is re-derived every interval anyway.
    let expected = expected_timespan_ms.max(1);
    let new_boundary = (expanded / primitive_types::U256::from(expected))
        .checked_mul(primitive_types::U256::from(actual))
        .unwrap_or(primitive_types::U256::max_value());
    Target::compact(new_boundary)
}

/// `true` iff `candidate` is within the allowed adjustment band relative to
/// `parent` (§4.4 header validation: target must be within the retarget
/// band). Used to reject headers that claim an implausible difficulty jump
/// without re-deriving the full retarget (which needs block timestamps the
/// caller already validated separately).
pub fn within_retarget_band(parent: Target, candidate: Target) -> bool {
    let parent_work = parent.work();
    let candidate_work = candidate.work();
    if parent_work.is_zero() {
        return true;
    }
    let four = primitive_types::U256::from(4u8);
    candidate_work <= parent_work.saturating_mul(four) && candidate_work >= parent_work / four.max(primitive_types::U256::one())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bits_zero_is_always_met() {
        let target = target_from_zero_bits(0);
        let hash = Hash::from_bytes([0xFFu8; 32]);
        assert!(hash_meets_target(&hash, &target));
    }

    #[test]
    fn higher_zero_bit_count_is_stricter() {
        let loose = target_from_zero_bits(4);
        let strict = target_from_zero_bits(16);
        assert!(strict.expand() < loose.expand());
    }

    #[test]
    fn retarget_longer_timespan_loosens_difficulty() {
        let current = target_from_zero_bits(16);
        let loosened = retarget(current, 8000, 4000);
        assert!(loosened.expand() >= current.expand());
    }

    #[test]
    fn within_band_accepts_small_changes() {
        let parent = target_from_zero_bits(16);
        let candidate = target_from_zero_bits(15);
        assert!(within_retarget_band(parent, candidate));
    }
}
