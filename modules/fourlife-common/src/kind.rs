use std::fmt;

use serde::{Deserialize, Serialize};

/// Which external simulation program a lab run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationKind {
    EpDrivenClosedLoop,
    EpFiveDomain,
    MaturationDemo,
    MultiLifeWithPolicy,
    OneLifeHomeSociety,
}

impl SimulationKind {
    pub const ALL: [SimulationKind; 5] = [
        SimulationKind::EpDrivenClosedLoop,
        SimulationKind::EpFiveDomain,
        SimulationKind::MaturationDemo,
        SimulationKind::MultiLifeWithPolicy,
        SimulationKind::OneLifeHomeSociety,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            SimulationKind::EpDrivenClosedLoop => "ep_driven_closed_loop",
            SimulationKind::EpFiveDomain => "ep_five_domain",
            SimulationKind::MaturationDemo => "maturation_demo",
            SimulationKind::MultiLifeWithPolicy => "multi_life_with_policy",
            SimulationKind::OneLifeHomeSociety => "one_life_home_society",
        }
    }

    /// Exact, case-sensitive match on the wire name.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == value)
    }

    pub fn allowed() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.as_str()).collect()
    }
}

impl fmt::Display for SimulationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavioral pattern corpus handed to the maturation demo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSource {
    #[default]
    Web4,
    None,
    Thor,
}

impl PatternSource {
    pub const ALL: [PatternSource; 3] = [PatternSource::Web4, PatternSource::None, PatternSource::Thor];

    pub const fn as_str(self) -> &'static str {
        match self {
            PatternSource::Web4 => "web4",
            PatternSource::None => "none",
            PatternSource::Thor => "thor",
        }
    }

    /// Unrecognized or missing values fall back to the default.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value
            .and_then(|v| Self::ALL.into_iter().find(|p| p.as_str() == v))
            .unwrap_or_default()
    }
}

impl fmt::Display for PatternSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabAction {
    #[default]
    Read,
    Run,
}

impl LabAction {
    /// Only the literal `run` selects a run; everything else reads.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value {
            Some("run") => LabAction::Run,
            _ => LabAction::Read,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LabAction::Read => "read",
            LabAction::Run => "run",
        }
    }
}
