use std::fmt;

use serde::Serialize;

use fourlife_common::{PatternSource, RunParams, SimulationKind};

/// Where a simulation script leaves its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "mode", content = "file", rename_all = "snake_case")]
pub enum OutputMode {
    /// Script writes this file (relative to its working directory).
    File(&'static str),
    /// Script prints the JSON document on stdout.
    Stdout,
}

/// How to produce and where to cache one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArtifactDescriptor {
    pub kind: SimulationKind,
    /// Cache file name under the public artifact directory.
    pub file_name: String,
    /// Script path relative to the engine directory.
    pub script: &'static str,
    pub args: Vec<String>,
    pub output: OutputMode,
}

const EP_DRIVEN_CLOSED_LOOP_OUTPUT: &str = "ep_driven_closed_loop_results.json";
const EP_FIVE_DOMAIN_OUTPUT: &str = "ep_five_domain_multi_life_results.json";

impl ArtifactDescriptor {
    pub fn for_request(kind: SimulationKind, params: &RunParams) -> Self {
        let lives = params.num_lives.to_string();
        let ticks = params.ticks.to_string();

        match kind {
            SimulationKind::EpDrivenClosedLoop => Self {
                kind,
                file_name: EP_DRIVEN_CLOSED_LOOP_OUTPUT.to_string(),
                script: "game/run_ep_driven_closed_loop.py",
                args: strings(["--lives", &lives, "--ticks", &ticks, "--output", EP_DRIVEN_CLOSED_LOOP_OUTPUT]),
                output: OutputMode::File(EP_DRIVEN_CLOSED_LOOP_OUTPUT),
            },
            SimulationKind::EpFiveDomain => Self {
                kind,
                file_name: EP_FIVE_DOMAIN_OUTPUT.to_string(),
                script: "game/run_ep_five_domain_multi_life.py",
                args: strings(["--lives", &lives, "--ticks", &ticks, "--output", EP_FIVE_DOMAIN_OUTPUT]),
                output: OutputMode::File(EP_FIVE_DOMAIN_OUTPUT),
            },
            SimulationKind::MaturationDemo => Self {
                kind,
                file_name: format!("maturation_demo_{}.json", params.pattern_source),
                script: "game/run_maturation_demo.py",
                args: strings(["--pattern-source", params.pattern_source.as_str()]),
                output: OutputMode::Stdout,
            },
            SimulationKind::MultiLifeWithPolicy => Self {
                kind,
                file_name: "multi_life_with_policy.json".to_string(),
                script: "game/run_multi_life_with_policy.py",
                args: strings(["--lives", &lives, "--ticks", &ticks]),
                output: OutputMode::Stdout,
            },
            SimulationKind::OneLifeHomeSociety => Self {
                kind,
                file_name: "one_life_home_society.json".to_string(),
                script: "game/run_one_life_home_society.py",
                args: strings(["--ticks", &ticks]),
                output: OutputMode::Stdout,
            },
        }
    }

    /// Every distinct cache file the table can name, with default numeric params.
    pub fn catalog() -> Vec<(Option<PatternSource>, ArtifactDescriptor)> {
        let mut out = Vec::new();
        for kind in SimulationKind::ALL {
            if kind == SimulationKind::MaturationDemo {
                for source in PatternSource::ALL {
                    let params = RunParams {
                        pattern_source: source,
                        ..RunParams::default()
                    };
                    out.push((Some(source), Self::for_request(kind, &params)));
                }
            } else {
                out.push((None, Self::for_request(kind, &RunParams::default())));
            }
        }
        out
    }
}

impl fmt::Display for ArtifactDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.script, self.args.join(" "))
    }
}

fn strings<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
