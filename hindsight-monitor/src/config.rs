//! Run configuration

use std::fmt;
use std::str::FromStr;

use crate::error::MonitorError;

/// How chatty a run is, mirrored into the tracing filter by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputLevel {
    /// No report output at all.
    Nothing,
    /// Benchmark mode: totals and per-event timing only.
    Experiment,
    #[default]
    Default,
    /// Track the frontier matching the monitor's clock cut after every event.
    MaxState,
    Debug,
}

impl FromStr for OutputLevel {
    type Err = MonitorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "nothing" => Ok(OutputLevel::Nothing),
            "experiment" => Ok(OutputLevel::Experiment),
            "default" => Ok(OutputLevel::Default),
            "max-state" => Ok(OutputLevel::MaxState),
            "debug" => Ok(OutputLevel::Debug),
            other => Err(MonitorError::InvalidOutputLevel(other.to_string())),
        }
    }
}

impl fmt::Display for OutputLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputLevel::Nothing => "nothing",
            OutputLevel::Experiment => "experiment",
            OutputLevel::Default => "default",
            OutputLevel::MaxState => "max-state",
            OutputLevel::Debug => "debug",
        };
        write!(f, "{name}")
    }
}

/// Monitor settings for one run.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Prune disabled frontiers from the live collection after each event.
    pub reduce: bool,
    pub output_level: OutputLevel,
}

impl RunConfig {
    pub fn new(reduce: bool, output_level: OutputLevel) -> Self {
        Self {
            reduce,
            output_level,
        }
    }

    pub fn is_debug(&self) -> bool {
        self.output_level == OutputLevel::Debug
    }

    pub fn is_quiet(&self) -> bool {
        matches!(
            self.output_level,
            OutputLevel::Nothing | OutputLevel::Experiment | OutputLevel::MaxState
        )
    }

    pub fn is_max_state(&self) -> bool {
        self.output_level == OutputLevel::MaxState
    }

    pub fn is_experiment(&self) -> bool {
        self.output_level == OutputLevel::Experiment
    }

    pub fn show_banner(&self) -> bool {
        !matches!(
            self.output_level,
            OutputLevel::Experiment | OutputLevel::Nothing
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels() {
        assert_eq!(
            "max-state".parse::<OutputLevel>().unwrap(),
            OutputLevel::MaxState
        );
        assert!("loud".parse::<OutputLevel>().is_err());
    }

    #[test]
    fn level_predicates() {
        let config = RunConfig::new(false, OutputLevel::Experiment);
        assert!(config.is_quiet());
        assert!(!config.show_banner());
        assert!(!config.is_debug());

        let config = RunConfig::new(true, OutputLevel::Debug);
        assert!(config.is_debug());
        assert!(config.show_banner());
    }
}
