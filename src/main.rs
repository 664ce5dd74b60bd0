use std::collections::BTreeMap;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use ociorabastar::config::Cli;
use ociorabastar::node::NodeBehavior;
use ociorabastar::sim;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(message) = cli.validate() {
        log::error!("invalid configuration: {message}");
        return ExitCode::FAILURE;
    }

    let mut behaviors: BTreeMap<u32, NodeBehavior> = BTreeMap::new();
    for &id in &cli.byzantine {
        behaviors.insert(id, cli.behavior.into());
    }

    let timeout = Duration::from_millis(cli.timeout_ms);
    let report = if cli.threaded {
        sim::run_threaded(cli.n, cli.t, cli.secret, &behaviors, timeout)
    } else {
        let (registry, honest_ids) = sim::build_registry(cli.n, cli.t, &behaviors);
        sim::run(&registry, &honest_ids, cli.secret, timeout)
    };

    for outcome in &report.outcomes {
        match outcome.result {
            Some(value) => log::info!(
                "node {}: complete={} final={}",
                outcome.id,
                outcome.complete,
                value
            ),
            None => log::info!(
                "node {}: complete={} final=bottom",
                outcome.id,
                outcome.complete
            ),
        }
    }

    match report.honest_consensus {
        Some(value) => log::info!("honest consensus: {value}"),
        None => log::warn!("no honest consensus reached"),
    }

    if report.timed_out {
        log::error!("simulation did not terminate within the timeout");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
