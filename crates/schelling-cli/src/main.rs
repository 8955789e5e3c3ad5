//! Schelling Game Runner
//!
//! Loads a scenario file, runs it to equilibrium or the iteration cap, and
//! prints a summary or the full report as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use schelling_core::MoveRule;

mod scenario;

use scenario::{label_counts, Scenario, ScenarioError};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "schelling")]
#[command(about = "Schelling segregation game simulator")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario
    Run {
        scenario: PathBuf,

        /// Random seed, overriding the scenario
        #[arg(long)]
        seed: Option<u64>,

        /// Iteration cap, overriding the scenario
        #[arg(long)]
        max_iterations: Option<u64>,

        /// Move rule, overriding the scenario
        #[arg(long, value_parser = parse_rule)]
        rule: Option<MoveRule>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a scenario without running it
    Check { scenario: PathBuf },
}

fn parse_rule(s: &str) -> Result<MoveRule, String> {
    MoveRule::ALL
        .into_iter()
        .find(|rule| rule.to_string() == s.replace('-', "_"))
        .ok_or_else(|| format!("unknown rule '{}' (expected jump, swap, max_jump or max_swap)", s))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error("Simulation failed: {0}")]
    Engine(#[from] schelling_core::EngineError),

    #[error("Could not serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

fn run(
    path: PathBuf,
    seed: Option<u64>,
    max_iterations: Option<u64>,
    rule: Option<MoveRule>,
    json: bool,
) -> Result<(), CliError> {
    let mut scenario = Scenario::load(&path)?;
    if let Some(seed) = seed {
        scenario.simulation.seed = seed;
    }
    if let Some(max_iterations) = max_iterations {
        scenario.simulation.max_iterations = max_iterations;
    }
    if let Some(rule) = rule {
        scenario.simulation.rule = rule;
    }

    tracing::info!("Loaded scenario {:?}", path);
    let report = scenario.build()?.run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let stats = &report.stats;
    println!("Schelling Game");
    println!("==============");
    println!("Rule: {}", scenario.simulation.rule);
    println!("Seed: {}", scenario.simulation.seed);
    if let Some(status) = report.status() {
        println!("Status: {}", status);
    }
    println!("Iterations: {}", stats.iterations);
    println!("Moves: {} ({} jumps, {} swaps)", stats.total_moves(), stats.jumps, stats.swaps);
    println!(
        "Mean utility: {:.3} -> {:.3}",
        stats.initial_mean_utility, stats.final_mean_utility
    );
    println!("Happy agents: {:.1}%", stats.final_happy_fraction * 100.0);
    if !stats.unhappy_agents.is_empty() {
        let names: Vec<String> = stats.unhappy_agents.iter().map(|a| a.to_string()).collect();
        println!("Unhappy: {}", names.join(", "));
    }
    Ok(())
}

fn check(path: PathBuf) -> Result<(), CliError> {
    let scenario = Scenario::load(&path)?;
    let (nodes, agents, vacant) = scenario.census()?;
    scenario.build()?;

    println!("Scenario OK: {:?}", path);
    println!("Nodes: {} ({} vacant)", nodes, vacant);
    println!("Agents: {}", agents);
    for (label, count) in label_counts(&scenario) {
        println!("  {}: {}", label, count);
    }
    println!("Rule: {}", scenario.simulation.rule);
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let result = match args.command {
        Command::Run {
            scenario,
            seed,
            max_iterations,
            rule,
            json,
        } => run(scenario, seed, max_iterations, rule, json),
        Command::Check { scenario } => check(scenario),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule_accepts_both_spellings() {
        assert_eq!(parse_rule("max-swap"), Ok(MoveRule::MaxSwap));
        assert_eq!(parse_rule("max_jump"), Ok(MoveRule::MaxJump));
        assert!(parse_rule("teleport").is_err());
    }

    #[test]
    fn test_args_parse_overrides() {
        let args = Args::parse_from(["schelling", "run", "s.toml", "--seed", "7", "--rule", "swap", "--json"]);
        match args.command {
            Command::Run { seed, rule, json, .. } => {
                assert_eq!(seed, Some(7));
                assert_eq!(rule, Some(MoveRule::Swap));
                assert!(json);
            }
            Command::Check { .. } => panic!("expected run"),
        }
    }
}
