//! Concrete end-to-end scenarios from spec.md section 8, run through the
//! public `sim`/`node` API exactly as a driver binary would.

use std::collections::BTreeMap;
use std::time::Duration;

use ociorabastar::field::{FieldElement, P};
use ociorabastar::node::NodeBehavior;
use ociorabastar::sim;

const TIMEOUT: Duration = Duration::from_secs(5);

fn byzantine_map(ids: &[u32], behavior: NodeBehavior) -> BTreeMap<u32, NodeBehavior> {
    ids.iter().map(|&id| (id, behavior)).collect()
}

/// S1: n=4, t=1, secret=2025, all honest.
#[test]
fn s1_all_honest_small_cluster() {
    let (registry, honest) = sim::build_registry(4, 1, &BTreeMap::new());
    let report = sim::run(&registry, &honest, 2025, TIMEOUT);
    assert!(!report.timed_out);
    for outcome in &report.outcomes {
        assert!(outcome.complete);
        assert_eq!(outcome.result, Some(FieldElement::new(2025).unwrap()));
    }
}

/// S2: n=4, t=1, secret=2025, node 1 Byzantine (corrupt-share + random-vote).
#[test]
fn s2_single_byzantine_node_both_behaviors() {
    let behaviors = byzantine_map(&[1], NodeBehavior::ByzantineBoth);
    let (registry, honest) = sim::build_registry(4, 1, &behaviors);
    let report = sim::run(&registry, &honest, 2025, TIMEOUT);
    assert!(!report.timed_out);

    let honest_complete = report
        .outcomes
        .iter()
        .filter(|o| honest.contains(&o.id) && o.complete)
        .count();
    assert!(honest_complete >= 3);
    if let Some(value) = report.honest_consensus {
        assert_eq!(value, FieldElement::new(2025).unwrap());
    }
}

/// S3: n=7, t=2, secret=42, nodes {1,2} Byzantine.
#[test]
fn s3_two_byzantine_nodes_larger_cluster() {
    let behaviors = byzantine_map(&[1, 2], NodeBehavior::ByzantineBoth);
    let (registry, honest) = sim::build_registry(7, 2, &behaviors);
    let report = sim::run(&registry, &honest, 42, TIMEOUT);
    assert!(!report.timed_out);
    if let Some(value) = report.honest_consensus {
        assert_eq!(value, FieldElement::new(42).unwrap());
    }
}

/// S4: n=4, t=1, secret=0, all honest (boundary secret).
#[test]
fn s4_boundary_secret_zero() {
    let (registry, honest) = sim::build_registry(4, 1, &BTreeMap::new());
    let report = sim::run(&registry, &honest, 0, TIMEOUT);
    assert!(!report.timed_out);
    for outcome in &report.outcomes {
        assert_eq!(outcome.result, Some(FieldElement::ZERO));
    }
}

/// S5: n=10, t=3, secret=P-1, nodes {1,2,3} Byzantine.
#[test]
fn s5_boundary_secret_max_with_larger_byzantine_minority() {
    let behaviors = byzantine_map(&[1, 2, 3], NodeBehavior::ByzantineBoth);
    let (registry, honest) = sim::build_registry(10, 3, &behaviors);
    let report = sim::run(&registry, &honest, P - 1, TIMEOUT);
    assert!(!report.timed_out);
    if let Some(value) = report.honest_consensus {
        assert_eq!(value, FieldElement::new(P - 1).unwrap());
    }
}

/// S6: with only t+1 honest votes cast into an agreement instance, the
/// decision follows once any further input (e.g. a default vote) brings the
/// total past quorum -- modeled directly at the agreement layer, since that
/// is where spec.md section 8 states the property.
#[test]
fn s6_minimal_honest_votes_plus_one_more_input_decide() {
    use ociorabastar::agreement::Abba;

    let n = 4usize;
    let t = 1usize;
    let mut abba = Abba::new(1, n, t);
    // t+1 = 2 honest votes of 1.
    abba.input(1, true);
    abba.input(2, true);
    assert!(!abba.decided());
    // A third input, standing in for the orchestrator's default-vote sweep,
    // pushes total votes to quorum (n-t=3); ones already meets t+1=2, so the
    // coin-assisted branch decides 1 regardless of this input's own value.
    abba.input(3, false);
    assert!(abba.decided());
    assert_eq!(abba.output(), Some(true));
}
