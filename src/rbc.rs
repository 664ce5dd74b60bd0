//! Reliable broadcast (C5): delivers a sender's payload to every node,
//! satisfying Validity, Agreement and Integrity (spec.md section 4.5).
//!
//! This core ships only the simulation backend spec.md permits: an
//! instantaneous fan-out to every node in the [`Registry`]. The contract is
//! expressed as a plain function over a generic sink so a quorum-certificate
//! RBC could replace it later without touching callers in `node` or `sim`.

use crate::transport::Registry;

/// Something that can receive an RBC delivery from `sender`.
///
/// Integrity is this sink's responsibility: a correct implementation
/// accepts at most one payload per sender and ignores any later delivery
/// for a sender it has already seen.
pub trait RbcSink<P> {
    fn deliver(&mut self, sender: u32, payload: P);
}

/// Broadcasts `payload`, originated by `sender`, to every node in
/// `registry`, including `sender` itself. Delivering the identical payload
/// to every member here is what gives Validity (every honest node receives
/// it) and Agreement (every honest node receives the *same* payload) for
/// free; Integrity is left to each sink.
pub fn broadcast<T, P>(registry: &Registry<T>, sender: u32, payload: P)
where
    T: RbcSink<P>,
    P: Clone,
{
    for handle in registry.handles() {
        let mut sink = handle.lock().expect("node mutex poisoned");
        sink.deliver(sender, payload.clone());
    }
}
