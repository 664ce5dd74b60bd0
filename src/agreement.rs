//! Binary asynchronous Byzantine agreement instance (C4, "ABBA").
//!
//! One `Abba` instance is dedicated to a single proposer: it consumes a
//! binary vote from each peer and produces a single binary decision. The
//! decision rule and its evaluation order are fixed by spec.md section 4.4;
//! this is a direct, typed translation of `original_source/main.py`'s
//! `ABBA` class.

use std::collections::BTreeMap;

use crate::common_coin::CommonCoin;

/// The common-coin round every `Abba` instance in this core uses. A full
/// asynchronous common-subset protocol would iterate rounds; this core
/// hard-codes round 1 (spec.md section 9) but the coin interface already
/// accepts a round index so advancing it later needs no rework.
const COIN_ROUND: u64 = 1;

/// Per-proposer binary agreement state machine.
pub struct Abba {
    proposer_id: u32,
    n: usize,
    t: usize,
    inputs: BTreeMap<u32, bool>,
    output: Option<bool>,
    coin: CommonCoin,
    coin_requested: bool,
}

impl Abba {
    /// Creates a fresh, undecided instance for `proposer_id`.
    pub fn new(proposer_id: u32, n: usize, t: usize) -> Self {
        Abba {
            proposer_id,
            n,
            t,
            inputs: BTreeMap::new(),
            output: None,
            coin: CommonCoin::new(t + 1),
            coin_requested: false,
        }
    }

    /// The proposer this instance is deciding on behalf of.
    pub fn proposer_id(&self) -> u32 {
        self.proposer_id
    }

    /// Accepts a vote from `sender`. Idempotent: a second input from the
    /// same sender is silently ignored, matching spec.md's invariant that at
    /// most one vote per `(voter, proposer)` pair is ever accepted.
    pub fn input(&mut self, sender: u32, vote: bool) {
        if self.inputs.contains_key(&sender) {
            return;
        }
        self.inputs.insert(sender, vote);
        log::debug!(
            "abba[{}]: received vote {} from node {}",
            self.proposer_id,
            vote,
            sender
        );

        // Only the very first input this instance ever receives triggers a
        // coin contribution (spec.md section 4.4); later inputs never
        // re-contribute.
        if !self.coin_requested {
            self.coin.contribute(sender, COIN_ROUND);
            self.coin_requested = true;
        }

        self.try_decide();
    }

    fn try_decide(&mut self) {
        if self.output.is_some() {
            return;
        }
        let ones = self.inputs.values().filter(|&&v| v).count();
        let total = self.inputs.len();
        let zeros = total - ones;
        let quorum = self.n - self.t;

        if ones >= quorum {
            self.decide(true);
        } else if zeros >= quorum {
            self.decide(false);
        } else if total >= quorum {
            if let Some(coin) = self.coin.value(COIN_ROUND) {
                if ones >= self.t + 1 {
                    self.decide(true);
                } else if zeros >= self.t + 1 {
                    self.decide(false);
                } else {
                    self.decide(coin);
                }
            }
        }
    }

    fn decide(&mut self, bit: bool) {
        self.output = Some(bit);
        log::info!("abba[{}]: decided {}", self.proposer_id, bit);
    }

    /// Whether this instance has reached a decision.
    pub fn decided(&self) -> bool {
        self.output.is_some()
    }

    /// The decided bit, if any.
    pub fn output(&self) -> Option<bool> {
        self.output
    }
}
