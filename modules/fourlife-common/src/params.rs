use std::time::Duration;

use thiserror::Error;

use crate::kind::{LabAction, PatternSource, SimulationKind};

/// Integer query parameter with an inclusive range and a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntParam {
    pub name: &'static str,
    pub min: i64,
    pub max: i64,
    pub default: i64,
}

impl IntParam {
    /// Non-numeric or empty input yields the default; numbers are floored and clamped.
    pub fn resolve(&self, raw: Option<&str>) -> i64 {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return self.default;
        };
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => (n.floor() as i64).clamp(self.min, self.max),
            _ => self.default,
        }
    }
}

pub const TIMEOUT_MS: IntParam = IntParam {
    name: "timeout_ms",
    min: 5_000,
    max: 300_000,
    default: 60_000,
};

pub const NUM_LIVES: IntParam = IntParam {
    name: "num_lives",
    min: 1,
    max: 50,
    default: 3,
};

pub const TICKS: IntParam = IntParam {
    name: "ticks",
    min: 1,
    max: 500,
    default: 20,
};

/// Query string exactly as received. Everything is optional text so that
/// bad numbers can fall back to defaults instead of failing extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabRunQuery {
    pub kind: Option<String>,
    pub action: Option<String>,
    pub timeout_ms: Option<String>,
    pub num_lives: Option<String>,
    pub ticks: Option<String>,
    pub pattern_source: Option<String>,
}

impl LabRunQuery {
    /// Build from decoded query pairs. The first occurrence of a key wins and
    /// unknown keys are ignored, so repeats never fail a request.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "kind" => &mut query.kind,
                "action" => &mut query.action,
                "timeout_ms" => &mut query.timeout_ms,
                "num_lives" => &mut query.num_lives,
                "ticks" => &mut query.ticks,
                "pattern_source" => &mut query.pattern_source,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        query
    }
}

/// Simulation inputs after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunParams {
    pub timeout: Duration,
    pub num_lives: u32,
    pub ticks: u32,
    pub pattern_source: PatternSource,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(TIMEOUT_MS.default as u64),
            num_lives: NUM_LIVES.default as u32,
            ticks: TICKS.default as u32,
            pattern_source: PatternSource::default(),
        }
    }
}

/// A validated lab-run request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRequest {
    pub kind: SimulationKind,
    pub action: LabAction,
    pub params: RunParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid kind: {}", given.as_deref().unwrap_or("<missing>"))]
pub struct InvalidKind {
    pub given: Option<String>,
}

impl RunRequest {
    /// Unknown kind is the only hard failure; other fields degrade to defaults.
    pub fn from_query(query: &LabRunQuery) -> Result<Self, InvalidKind> {
        let kind = query
            .kind
            .as_deref()
            .and_then(SimulationKind::parse)
            .ok_or_else(|| InvalidKind {
                given: query.kind.clone(),
            })?;

        Ok(Self {
            kind,
            action: LabAction::parse_or_default(query.action.as_deref()),
            params: RunParams {
                timeout: Duration::from_millis(TIMEOUT_MS.resolve(query.timeout_ms.as_deref()) as u64),
                num_lives: NUM_LIVES.resolve(query.num_lives.as_deref()) as u32,
                ticks: TICKS.resolve(query.ticks.as_deref()) as u32,
                pattern_source: PatternSource::parse_or_default(query.pattern_source.as_deref()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(kind: &str) -> LabRunQuery {
        LabRunQuery {
            kind: Some(kind.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn below_min_clamps_up() {
        assert_eq!(NUM_LIVES.resolve(Some("0")), 1);
        assert_eq!(TIMEOUT_MS.resolve(Some("10")), 5_000);
        assert_eq!(TICKS.resolve(Some("-7")), 1);
    }

    #[test]
    fn above_max_clamps_down() {
        assert_eq!(NUM_LIVES.resolve(Some("999")), 50);
        assert_eq!(TIMEOUT_MS.resolve(Some("9999999")), 300_000);
        assert_eq!(TICKS.resolve(Some("501")), 500);
    }

    #[test]
    fn non_numeric_uses_default() {
        assert_eq!(NUM_LIVES.resolve(Some("lots")), 3);
        assert_eq!(TICKS.resolve(Some("")), 20);
        assert_eq!(TICKS.resolve(Some("NaN")), 20);
        assert_eq!(TIMEOUT_MS.resolve(Some("inf")), 60_000);
        assert_eq!(TIMEOUT_MS.resolve(None), 60_000);
    }

    #[test]
    fn fractional_values_are_floored() {
        assert_eq!(NUM_LIVES.resolve(Some("4.9")), 4);
        assert_eq!(TICKS.resolve(Some(" 12 ")), 12);
    }

    #[test]
    fn repeated_keys_keep_the_first_value() {
        let q = LabRunQuery::from_pairs([
            ("kind", "ep_five_domain"),
            ("ticks", "5"),
            ("ticks", "6"),
            ("kind", "not_a_real_kind"),
            ("utm_source", "newsletter"),
        ]);
        assert_eq!(q.kind.as_deref(), Some("ep_five_domain"));
        assert_eq!(q.ticks.as_deref(), Some("5"));

        let req = RunRequest::from_query(&q).unwrap();
        assert_eq!(req.params.ticks, 5);
    }

    #[test]
    fn missing_kind_is_rejected() {
        let err = RunRequest::from_query(&LabRunQuery::default()).unwrap_err();
        assert_eq!(err.given, None);
    }

    #[test]
    fn unknown_kind_is_rejected_regardless_of_other_params() {
        let q = LabRunQuery {
            kind: Some("not_a_real_kind".to_string()),
            action: Some("run".to_string()),
            num_lives: Some("5".to_string()),
            ..Default::default()
        };
        let err = RunRequest::from_query(&q).unwrap_err();
        assert_eq!(err.given.as_deref(), Some("not_a_real_kind"));
    }

    #[test]
    fn defaults_apply_when_only_kind_given() {
        let req = RunRequest::from_query(&query("ep_five_domain")).unwrap();
        assert_eq!(req.kind, SimulationKind::EpFiveDomain);
        assert_eq!(req.action, LabAction::Read);
        assert_eq!(req.params, RunParams::default());
    }

    #[test]
    fn bogus_pattern_source_equals_omitted() {
        let omitted = RunRequest::from_query(&query("maturation_demo")).unwrap();
        let bogus = RunRequest::from_query(&LabRunQuery {
            pattern_source: Some("bogus".to_string()),
            ..query("maturation_demo")
        })
        .unwrap();
        assert_eq!(omitted, bogus);
    }
}
