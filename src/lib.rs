//! OciorABA*: asynchronous Byzantine agreement with secret-sharing-based
//! value reconstruction.
//!
//! The core is the composition of a threshold secret-sharing codec
//! ([`field`], [`codec`]), a reliable broadcast abstraction ([`rbc`]), `n`
//! parallel binary Byzantine agreement instances with a common coin
//! ([`agreement`], [`common_coin`]), and a per-node orchestrator that ties
//! them together and reconstructs the agreed value ([`node`], [`transport`]).
//! [`config`] and [`sim`] are the external driver surface, not part of the
//! core protocol.

pub mod agreement;
pub mod codec;
pub mod common_coin;
pub mod config;
pub mod error;
pub mod field;
pub mod node;
pub mod rbc;
pub mod sim;
pub mod transport;
