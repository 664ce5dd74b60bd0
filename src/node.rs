//! Per-node orchestrator (C6): propose, validate, vote, aggregate, reconstruct.
//!
//! A `Node` never calls another node directly. Every state change that must
//! be visible to peers is returned as an [`Outgoing`] message for a driver
//! (the single-threaded `sim` loop, or a threaded mailbox runner) to fan out
//! through the `transport` registry -- the same message-output shape hbbft's
//! `DistAlgorithm::Step` uses, adapted here to a plain `Vec` since this core
//! has no epoch bookkeeping to carry alongside it.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agreement::Abba;
use crate::codec::{self, Share};
use crate::error::NodeError;
use crate::field::{FieldElement, P};

/// How a node behaves. Byzantine behaviors exist only for tests and the
/// simulation driver; `Node`'s own logic treats every peer uniformly and
/// never inspects another node's behavior (spec.md section 9's open
/// question on Byzantine identity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeBehavior {
    Honest,
    ByzantineRandomVote,
    ByzantineCorruptShare,
    ByzantineBoth,
}

impl NodeBehavior {
    fn corrupts_share(self) -> bool {
        matches!(
            self,
            NodeBehavior::ByzantineCorruptShare | NodeBehavior::ByzantineBoth
        )
    }

    fn votes_randomly(self) -> bool {
        matches!(
            self,
            NodeBehavior::ByzantineRandomVote | NodeBehavior::ByzantineBoth
        )
    }
}

/// Tunables not named directly by the external construction contract.
#[derive(Debug, Clone, Copy)]
pub struct NodeConfig {
    /// When `true` (the default), `finalize` sets `final = None` the moment
    /// an accepted proposer's share hasn't arrived yet. When `false`,
    /// finalize defers instead, retried on the next ABBA sweep, until every
    /// share in `B` has arrived (spec.md section 9's open question, resolved
    /// in favor of exposing both as a configurable choice).
    pub finalize_on_missing_shares: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            finalize_on_missing_shares: true,
        }
    }
}

/// A message a [`Node`] wants delivered to every node in the registry
/// (including itself -- both variants are idempotent on redelivery).
#[derive(Debug, Clone, Copy)]
pub enum Outgoing {
    /// This node's own RBC share broadcast.
    RbcShare { sender: u32, share: Share },
    /// This node's vote on `proposer`'s share, to be injected into every
    /// node's `abba[proposer]` instance.
    Vote {
        proposer: u32,
        voter: u32,
        vote: bool,
    },
}

/// Per-node orchestrator state (spec.md section 3).
pub struct Node {
    id: u32,
    n: u32,
    t: u32,
    behavior: NodeBehavior,
    config: NodeConfig,
    own_shares: Option<Vec<Share>>,
    received_share: BTreeMap<u32, Share>,
    vote: BTreeMap<u32, bool>,
    pending: Vec<(u32, Share)>,
    abba: BTreeMap<u32, Abba>,
    abba_out: BTreeMap<u32, bool>,
    final_value: Option<FieldElement>,
    complete: bool,
    rng: StdRng,
}

impl Node {
    /// Builds a fresh node with the default [`NodeConfig`].
    pub fn new(id: u32, n: u32, t: u32, behavior: NodeBehavior) -> Self {
        Node::with_config(id, n, t, behavior, NodeConfig::default())
    }

    /// Builds a fresh node with an explicit [`NodeConfig`].
    pub fn with_config(id: u32, n: u32, t: u32, behavior: NodeBehavior, config: NodeConfig) -> Self {
        let mut abba = BTreeMap::new();
        for j in 1..=n {
            abba.insert(j, Abba::new(j, n as usize, t as usize));
        }
        Node {
            id,
            n,
            t,
            behavior,
            config,
            own_shares: None,
            received_share: BTreeMap::new(),
            vote: BTreeMap::new(),
            pending: Vec::new(),
            abba,
            abba_out: BTreeMap::new(),
            // Seeded from the node id: reproducible test runs, not a
            // cryptographic concern since this feeds only the Byzantine
            // random-vote test fixture.
            rng: StdRng::seed_from_u64(u64::from(id)),
            final_value: None,
            complete: false,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Encodes `secret` (or, under a share-corrupting Byzantine behavior, a
    /// derived value) into `n` shares, keeps this node's own copy, and
    /// returns the outgoing RBC broadcast plus any vote messages produced by
    /// draining shares that arrived before this call.
    pub fn propose(&mut self, secret: u128) -> Result<Vec<Outgoing>, NodeError> {
        let effective_secret = if self.behavior.corrupts_share() {
            (secret + u128::from(self.id) * 1000) % P
        } else {
            secret
        };
        let shares = codec::encode(effective_secret, self.n, self.t + 1)?;
        let mine = shares[(self.id - 1) as usize];
        self.own_shares = Some(shares);
        log::info!(
            "node {}: proposed (behavior {:?}), broadcasting share x={}",
            self.id,
            self.behavior,
            mine.x
        );

        let mut outgoing = vec![Outgoing::RbcShare {
            sender: self.id,
            share: mine,
        }];
        for (sender, share) in std::mem::take(&mut self.pending) {
            outgoing.extend(self.process_share(sender, share));
        }
        Ok(outgoing)
    }

    /// Handles an RBC delivery of `sender`'s share. Buffers it if this
    /// node hasn't proposed yet (spec.md section 4.6's buffering rule).
    pub fn on_rbc_deliver(&mut self, sender: u32, share: Share) -> Vec<Outgoing> {
        if self.own_shares.is_none() {
            self.pending.push((sender, share));
            return Vec::new();
        }
        self.process_share(sender, share)
    }

    fn process_share(&mut self, sender: u32, share: Share) -> Vec<Outgoing> {
        // Integrity: a second delivery for a sender already recorded is ignored.
        if self.received_share.contains_key(&sender) {
            return Vec::new();
        }
        self.received_share.insert(sender, share);

        let vote = if self.behavior.votes_randomly() {
            self.rng.gen_bool(0.5)
        } else {
            let expected = self
                .own_shares
                .as_ref()
                .expect("own_shares populated before process_share runs")[(sender - 1) as usize];
            // A coordinate mismatch is Byzantine equivocation, not a crate
            // error: it simply counts as a vote of 0 (spec.md section 7,
            // ShareCoordinateMismatch).
            share.x == expected.x && share.y == expected.y
        };
        self.vote.insert(sender, vote);
        log::debug!(
            "node {}: validated share from {} -> vote {}",
            self.id,
            sender,
            vote
        );

        self.cast_vote(sender, self.id, vote);
        vec![Outgoing::Vote {
            proposer: sender,
            voter: self.id,
            vote,
        }]
    }

    /// Handles a vote broadcast by `voter` on `proposer`'s share.
    pub fn on_vote(&mut self, proposer: u32, voter: u32, vote: bool) {
        self.cast_vote(proposer, voter, vote);
    }

    fn cast_vote(&mut self, proposer: u32, voter: u32, vote: bool) {
        if let Some(abba) = self.abba.get_mut(&proposer) {
            abba.input(voter, vote);
        }
        self.abba_sweep();
    }

    fn collect_decisions(&mut self) {
        let decided: Vec<(u32, bool)> = self
            .abba
            .iter()
            .filter(|(j, _)| !self.abba_out.contains_key(j))
            .filter_map(|(&j, ab)| ab.output().map(|v| (j, v)))
            .collect();
        for (j, v) in decided {
            self.abba_out.insert(j, v);
            log::info!("node {}: abba_out[{}] = {}", self.id, j, v);
        }
    }

    fn abba_sweep(&mut self) {
        self.collect_decisions();
        if self.abba_out.is_empty() {
            return;
        }
        // Default-vote injection: accelerates stragglers toward decision.
        // Purely local -- never broadcast -- and safe because idempotence
        // prevents double-voting and a genuine n-t quorum always wins over
        // an injected 0 (spec.md section 9).
        for j in 1..=self.n {
            if !self.abba_out.contains_key(&j) {
                if let Some(ab) = self.abba.get_mut(&j) {
                    ab.input(self.id, false);
                }
            }
        }
        self.collect_decisions();
        if self.abba_out.len() == self.n as usize {
            self.finalize();
        }
    }

    fn finalize(&mut self) {
        if self.complete {
            return;
        }
        let accepted: Vec<u32> = (1..=self.n)
            .filter(|j| self.abba_out.get(j) == Some(&true))
            .collect();
        let k = (self.t + 1) as usize;

        if accepted.len() < k {
            log::info!(
                "node {}: finalize -> bottom (only {} accepted proposers, need {})",
                self.id,
                accepted.len(),
                k
            );
            self.final_value = None;
            self.complete = true;
            return;
        }

        let b: Vec<u32> = accepted.into_iter().take(k).collect();
        let mut shares = Vec::with_capacity(b.len());
        for j in &b {
            match self.received_share.get(j) {
                Some(s) => shares.push(*s),
                None => {
                    if self.config.finalize_on_missing_shares {
                        log::warn!(
                            "node {}: finalize -> bottom (share from accepted proposer {} not yet delivered)",
                            self.id,
                            j
                        );
                        self.final_value = None;
                        self.complete = true;
                    } else {
                        log::debug!(
                            "node {}: finalize deferred, waiting on share from proposer {}",
                            self.id,
                            j
                        );
                    }
                    return;
                }
            }
        }

        match codec::decode(&shares, k) {
            Ok(value) => {
                log::info!("node {}: finalize -> {}", self.id, value);
                self.final_value = Some(value);
            }
            Err(err) => {
                // B always holds k distinct-x shares by construction above;
                // reaching here would be a bug, not a protocol-level ⊥.
                log::warn!("node {}: unexpected decode failure: {}", self.id, err);
                self.final_value = None;
            }
        }
        self.complete = true;
    }

    /// Whether this node has reached `complete = true`.
    pub fn complete(&self) -> bool {
        self.complete
    }

    /// The reconstructed value, or `None` (⊥) once complete. `None` before
    /// completion simply means "not decided yet".
    pub fn result(&self) -> Option<FieldElement> {
        self.final_value
    }

    /// A snapshot of every proposer's decided ABBA bit so far, for reporting.
    pub fn abba_out_snapshot(&self) -> BTreeMap<u32, bool> {
        self.abba_out.clone()
    }
}
