//! Regenerate lab artifacts from the command line, e.g. to warm the public
//! cache before a deploy. Uses the same engine and cache as the server.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fourlife_common::{
    Config, PatternSource, RunParams, SimulationKind, NUM_LIVES, TICKS, TIMEOUT_MS,
};
use fourlife_lab::{AppState, ArtifactDescriptor};

#[derive(Parser)]
#[command(name = "lab-run", about = "Run a Web4 lab simulation and cache its artifact")]
struct Cli {
    /// Simulation kind (ep_driven_closed_loop, ep_five_domain, maturation_demo, multi_life_with_policy, one_life_home_society)
    #[arg(required_unless_present = "all")]
    kind: Option<String>,

    #[arg(long)]
    num_lives: Option<String>,

    #[arg(long)]
    ticks: Option<String>,

    #[arg(long)]
    pattern_source: Option<String>,

    #[arg(long)]
    timeout_ms: Option<String>,

    /// Run every kind (and every maturation pattern source) instead of one
    #[arg(long, conflicts_with_all = ["kind", "num_lives", "ticks", "pattern_source"])]
    all: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fourlife=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    config.log_summary();

    let state = AppState::from_config(&config);
    let timeout = Duration::from_millis(TIMEOUT_MS.resolve(cli.timeout_ms.as_deref()) as u64);

    let descriptors = if cli.all {
        ArtifactDescriptor::catalog()
            .into_iter()
            .map(|(_, d)| d)
            .collect()
    } else {
        let given = cli.kind.as_deref().unwrap_or_default();
        let Some(kind) = SimulationKind::parse(given) else {
            anyhow::bail!(
                "Unknown kind {:?}; expected one of: {}",
                given,
                SimulationKind::allowed().join(", ")
            );
        };
        let params = RunParams {
            timeout,
            num_lives: NUM_LIVES.resolve(cli.num_lives.as_deref()) as u32,
            ticks: TICKS.resolve(cli.ticks.as_deref()) as u32,
            pattern_source: PatternSource::parse_or_default(cli.pattern_source.as_deref()),
        };
        vec![ArtifactDescriptor::for_request(kind, &params)]
    };

    let mut failures = 0;
    for descriptor in &descriptors {
        let flight = state.lab.run(descriptor, timeout).await;
        match flight.result {
            Ok(bytes) => println!(
                "{}: wrote {} bytes to {}",
                descriptor.kind,
                bytes.len(),
                state.lab.cache().path(&descriptor.file_name).display()
            ),
            Err(e) => {
                failures += 1;
                eprintln!("{}: {e}", descriptor.kind);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} lab runs failed", descriptors.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn all_cannot_be_combined_with_a_kind() {
        assert!(Cli::try_parse_from(["lab-run", "ep_five_domain", "--all"]).is_err());
        assert!(Cli::try_parse_from(["lab-run", "--all", "--ticks", "5"]).is_err());
    }

    #[test]
    fn kind_or_all_is_required() {
        assert!(Cli::try_parse_from(["lab-run"]).is_err());
        assert!(Cli::try_parse_from(["lab-run", "--all"]).is_ok());

        let cli = Cli::try_parse_from(["lab-run", "maturation_demo", "--pattern-source", "thor"]).unwrap();
        assert_eq!(cli.kind.as_deref(), Some("maturation_demo"));
        assert_eq!(cli.pattern_source.as_deref(), Some("thor"));
        assert!(!cli.all);
    }
}
