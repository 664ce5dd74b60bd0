//! Common coin (C3): a per-round threshold-coin abstraction.
//!
//! The coin freezes to a single shared bit once `t+1` contributions have
//! been registered for a round. The value is unpredictable to an adversary
//! only once `t+1` *honest* contributions are in; this module's
//! [`DeterministicCoin`] backend is the simulation placeholder spec.md
//! section 4.3 explicitly permits, carried over from the shared-bit formula
//! in `original_source/main.py`'s `CommonCoin.contribute_share`. The
//! [`CoinBackend`] trait is the seam a VRF or threshold-signature backend
//! would implement instead, without any caller-visible change.

use std::collections::BTreeMap;

/// Something that can produce a node's deterministic (or, in a production
/// backend, cryptographically hard to predict) coin share for a round.
pub trait CoinBackend {
    /// Returns the bit `node_id` contributes for `round`.
    fn share(&self, node_id: u32, round: u64) -> bool;
}

/// The simulation/reference backend: `share = (node_id * 7 + round * 13) % 2`.
///
/// This is a placeholder, not a cryptographic primitive -- see spec.md
/// section 4.3 and the module-level docs above.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeterministicCoin;

impl CoinBackend for DeterministicCoin {
    fn share(&self, node_id: u32, round: u64) -> bool {
        (u64::from(node_id) * 7 + round * 13) % 2 == 1
    }
}

#[derive(Default)]
struct RoundState {
    /// Contributions in first-received order; later duplicates are dropped.
    order: Vec<(u32, bool)>,
    contributed: std::collections::BTreeSet<u32>,
    value: Option<bool>,
}

/// A common-coin instance, parameterized by the number of contributions
/// (`t+1`) required to freeze a round's value.
pub struct CommonCoin<B: CoinBackend = DeterministicCoin> {
    threshold: usize,
    backend: B,
    rounds: BTreeMap<u64, RoundState>,
}

impl CommonCoin<DeterministicCoin> {
    /// Builds a coin using the reference [`DeterministicCoin`] backend.
    pub fn new(threshold: usize) -> Self {
        CommonCoin::with_backend(threshold, DeterministicCoin)
    }
}

impl<B: CoinBackend> CommonCoin<B> {
    /// Builds a coin that requires `threshold` contributions per round
    /// before freezing, using a custom [`CoinBackend`].
    pub fn with_backend(threshold: usize, backend: B) -> Self {
        CommonCoin {
            threshold,
            backend,
            rounds: BTreeMap::new(),
        }
    }

    /// Registers `node_id`'s contribution for `round`. Idempotent per
    /// `(node_id, round)` pair; returns the bit `node_id` contributed.
    pub fn contribute(&mut self, node_id: u32, round: u64) -> bool {
        let share = self.backend.share(node_id, round);
        let state = self.rounds.entry(round).or_default();
        if state.contributed.insert(node_id) {
            state.order.push((node_id, share));
            if state.value.is_none() && state.order.len() >= self.threshold {
                let mut xor = false;
                for &(_, bit) in state.order.iter().take(self.threshold) {
                    xor ^= bit;
                }
                state.value = Some(xor);
            }
        }
        share
    }

    /// The frozen value for `round`, if `t+1` contributions have arrived.
    pub fn value(&self, round: u64) -> Option<bool> {
        self.rounds.get(&round).and_then(|s| s.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freezes_after_threshold_contributions() {
        let mut coin = CommonCoin::new(2);
        assert_eq!(coin.value(1), None);
        coin.contribute(1, 1);
        assert_eq!(coin.value(1), None);
        coin.contribute(2, 1);
        assert!(coin.value(1).is_some());
    }

    #[test]
    fn contribution_is_idempotent_per_node_and_round() {
        let mut coin = CommonCoin::new(2);
        coin.contribute(1, 1);
        coin.contribute(1, 1);
        assert_eq!(coin.value(1), None, "a single distinct contributor can't freeze a threshold of 2");
        coin.contribute(2, 1);
        assert!(coin.value(1).is_some());
    }

    #[test]
    fn value_is_frozen_once_set() {
        let mut coin = CommonCoin::new(1);
        coin.contribute(1, 1);
        let frozen = coin.value(1);
        // Further contributions must not change the already-frozen value.
        coin.contribute(2, 1);
        coin.contribute(3, 1);
        assert_eq!(coin.value(1), frozen);
    }

    #[test]
    fn rounds_are_independent() {
        let mut coin = CommonCoin::new(1);
        coin.contribute(1, 1);
        assert!(coin.value(1).is_some());
        assert_eq!(coin.value(2), None);
    }

    struct FixedCoin(bool);
    impl CoinBackend for FixedCoin {
        fn share(&self, _node_id: u32, _round: u64) -> bool {
            self.0
        }
    }

    #[test]
    fn custom_backend_is_pluggable() {
        let mut coin = CommonCoin::with_backend(1, FixedCoin(true));
        coin.contribute(1, 1);
        assert_eq!(coin.value(1), Some(true));
    }
}
