//! CLI / config surface (external driver, not core): `n`, `t`, `secret`, the
//! behavior selector, and the wall-clock timeout spec.md section 6 names.

use clap::{Parser, ValueEnum};

use crate::node::NodeBehavior;

/// Byzantine behavior to inject for the nodes named by `--byzantine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BehaviorArg {
    RandomVote,
    CorruptShare,
    Both,
}

impl From<BehaviorArg> for NodeBehavior {
    fn from(value: BehaviorArg) -> Self {
        match value {
            BehaviorArg::RandomVote => NodeBehavior::ByzantineRandomVote,
            BehaviorArg::CorruptShare => NodeBehavior::ByzantineCorruptShare,
            BehaviorArg::Both => NodeBehavior::ByzantineBoth,
        }
    }
}

/// Runs one simulated instance of the protocol to completion or timeout.
#[derive(Debug, Parser)]
#[command(name = "ociorabastar", about = "OciorABA* asynchronous Byzantine agreement simulator")]
pub struct Cli {
    /// Number of nodes.
    #[arg(short = 'n', long)]
    pub n: u32,

    /// Byzantine fault tolerance (requires n >= 3t+1).
    #[arg(short = 't', long)]
    pub t: u32,

    /// The secret every honest node proposes.
    #[arg(long)]
    pub secret: u128,

    /// 1-based ids of the nodes to make Byzantine (empty: all-honest run).
    #[arg(long, value_delimiter = ',')]
    pub byzantine: Vec<u32>,

    /// Byzantine behavior applied to every id in `--byzantine`.
    #[arg(long, value_enum, default_value_t = BehaviorArg::Both)]
    pub behavior: BehaviorArg,

    /// Wall-clock timeout, in milliseconds, before declaring non-termination.
    #[arg(long, default_value_t = 2000)]
    pub timeout_ms: u64,

    /// Use the one-task-per-node threaded realization instead of the
    /// single-threaded cooperative simulation.
    #[arg(long, default_value_t = false)]
    pub threaded: bool,
}

impl Cli {
    /// Rejects configurations that violate `n >= 3t+1` or place a node id
    /// outside `1..=n` in `--byzantine`.
    pub fn validate(&self) -> Result<(), String> {
        if self.n < 3 * self.t + 1 {
            return Err(format!(
                "n={} does not satisfy n >= 3t+1 for t={}",
                self.n, self.t
            ));
        }
        for &id in &self.byzantine {
            if id == 0 || id > self.n {
                return Err(format!("byzantine node id {} out of range 1..={}", id, self.n));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(n: u32, t: u32) -> Cli {
        Cli {
            n,
            t,
            secret: 0,
            byzantine: Vec::new(),
            behavior: BehaviorArg::Both,
            timeout_ms: 1000,
            threaded: false,
        }
    }

    #[test]
    fn rejects_n_below_3t_plus_1() {
        assert!(base(3, 1).validate().is_err());
        assert!(base(4, 1).validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_byzantine_ids() {
        let mut cli = base(4, 1);
        cli.byzantine = vec![5];
        assert!(cli.validate().is_err());
        cli.byzantine = vec![4];
        assert!(cli.validate().is_ok());
    }
}
