use std::path::PathBuf;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

const TICK_SECONDS_ENV_VAR: &str = "WAYFARER_TICK_SECONDS";
const AUTOSAVE_ENV_VAR: &str = "WAYFARER_AUTOSAVE";
const DEFAULT_TICK_SECONDS: f32 = 1.0 / 30.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    pub level_path: PathBuf,
    pub script_path: Option<PathBuf>,
    /// Step used by `tick` lines when they carry no explicit duration.
    pub tick_seconds: f32,
    /// Write the save file once the script finishes.
    pub autosave: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            level_path: PathBuf::from("levels/level.json"),
            script_path: None,
            tick_seconds: DEFAULT_TICK_SECONDS,
            autosave: false,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("usage: level_runner <level.json> [script.txt]")]
    MissingLevelPath,
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
    #[error("{var} must be a positive number of seconds, got '{raw}'")]
    InvalidTickSeconds { var: &'static str, raw: String },
    #[error("{var} must be one of 1/0/true/false/yes/no/on/off, got '{raw}'")]
    InvalidFlag { var: &'static str, raw: String },
}

impl RunnerConfig {
    pub fn from_env_and_args(args: impl IntoIterator<Item = String>) -> Result<Self, ConfigError> {
        Self::from_sources(args, |var| std::env::var(var).ok())
    }

    fn from_sources(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut args = args.into_iter();
        let level_path = args
            .next()
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingLevelPath)?;
        let script_path = args.next().map(PathBuf::from);
        if let Some(extra) = args.next() {
            return Err(ConfigError::UnexpectedArgument(extra));
        }

        let mut config = Self {
            level_path,
            script_path,
            ..Self::default()
        };
        if let Some(raw) = non_empty(env(TICK_SECONDS_ENV_VAR)) {
            config.tick_seconds = parse_tick_seconds(&raw)?;
        }
        if let Some(raw) = non_empty(env(AUTOSAVE_ENV_VAR)) {
            config.autosave = parse_flag(AUTOSAVE_ENV_VAR, &raw)?;
        }
        Ok(config)
    }
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_tick_seconds(raw: &str) -> Result<f32, ConfigError> {
    match raw.parse::<f32>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(ConfigError::InvalidTickSeconds {
            var: TICK_SECONDS_ENV_VAR,
            raw: raw.to_string(),
        }),
    }
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var,
            raw: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn positional_arguments_fill_level_and_script() {
        let config = RunnerConfig::from_sources(args(&["a.json", "b.txt"]), |_| None)
            .expect("config");
        assert_eq!(config.level_path, PathBuf::from("a.json"));
        assert_eq!(config.script_path, Some(PathBuf::from("b.txt")));
        assert_eq!(config.tick_seconds, DEFAULT_TICK_SECONDS);
        assert!(!config.autosave);
    }

    #[test]
    fn missing_level_path_and_extra_arguments_are_rejected() {
        assert_eq!(
            RunnerConfig::from_sources(Vec::new(), |_| None),
            Err(ConfigError::MissingLevelPath)
        );
        assert_eq!(
            RunnerConfig::from_sources(args(&["a", "b", "c"]), |_| None),
            Err(ConfigError::UnexpectedArgument("c".to_string()))
        );
    }

    #[test]
    fn env_overrides_tick_and_autosave() {
        let config = RunnerConfig::from_sources(args(&["a.json"]), |var| match var {
            TICK_SECONDS_ENV_VAR => Some(" 0.5 ".to_string()),
            AUTOSAVE_ENV_VAR => Some("ON".to_string()),
            _ => None,
        })
        .expect("config");
        assert_eq!(config.tick_seconds, 0.5);
        assert!(config.autosave);
    }

    #[test]
    fn blank_env_values_keep_defaults_and_bad_ones_fail() {
        let config = RunnerConfig::from_sources(args(&["a.json"]), |_| Some("  ".to_string()))
            .expect("config");
        assert_eq!(config.tick_seconds, DEFAULT_TICK_SECONDS);

        let err = RunnerConfig::from_sources(args(&["a.json"]), |var| {
            (var == TICK_SECONDS_ENV_VAR).then(|| "-1".to_string())
        })
        .expect_err("negative tick");
        assert!(matches!(err, ConfigError::InvalidTickSeconds { .. }));

        let err = RunnerConfig::from_sources(args(&["a.json"]), |var| {
            (var == AUTOSAVE_ENV_VAR).then(|| "maybe".to_string())
        })
        .expect_err("bad flag");
        assert!(matches!(err, ConfigError::InvalidFlag { .. }));
    }
}
