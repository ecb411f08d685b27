use crate::analysis::detection::{validate_phi, DEFAULT_PHI};
use crate::analysis::ranking::DEFAULT_TOP_N;
use crate::analysis::scoring::{DecayWeight, DEFAULT_DECAY_SECONDS};
use crate::error::{AnalysisError, AnalysisResult};
use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Gaussian band multiplier applied to every feature's residual std-dev.
    pub phi: f64,
    /// Number of top-scoring time steps that feed the date ranking.
    pub top_n: usize,
    /// Scale of the delay weight `exp(-dt / decay_half_life_seconds)`.
    pub decay_half_life_seconds: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            phi: DEFAULT_PHI,
            top_n: DEFAULT_TOP_N,
            decay_half_life_seconds: DEFAULT_DECAY_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigOverrides {
    #[serde(default)]
    phi: Option<f64>,
    #[serde(default)]
    top_n: Option<usize>,
    #[serde(default)]
    decay_half_life_seconds: Option<f64>,
}

fn config_path_from_env() -> Option<PathBuf> {
    env::var("ANOMALY_CONFIG_PATH")
        .ok()
        .map(|path| path.trim().to_string())
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

fn read_overrides(path: &Path) -> Result<ConfigOverrides> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let overrides: ConfigOverrides = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(overrides)
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = trimmed, "ignoring unparseable environment override");
            None
        }
    }
}

impl AnalysisConfig {
    /// Defaults, then `ANOMALY_*` environment overrides, then the JSON config file.
    ///
    /// An explicit `path` must be readable; the `ANOMALY_CONFIG_PATH` fallback only warns.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut config = Self::default();
        if let Some(phi) = env_parsed::<f64>("ANOMALY_PHI") {
            config.phi = phi;
        }
        if let Some(top_n) = env_parsed::<usize>("ANOMALY_TOP_N") {
            config.top_n = top_n;
        }
        if let Some(decay) = env_parsed::<f64>("ANOMALY_DECAY_SECONDS") {
            config.decay_half_life_seconds = decay;
        }

        let overrides = match path {
            Some(path) => Some(read_overrides(path)?),
            None => config_path_from_env().and_then(|path| match read_overrides(&path) {
                Ok(overrides) => Some(overrides),
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        "failed to load config; using env defaults: {err:#}"
                    );
                    None
                }
            }),
        };
        if let Some(overrides) = overrides {
            config.apply(&overrides);
        }

        Ok(config)
    }

    fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(phi) = overrides.phi {
            self.phi = phi;
        }
        if let Some(top_n) = overrides.top_n {
            self.top_n = top_n;
        }
        if let Some(decay) = overrides.decay_half_life_seconds {
            self.decay_half_life_seconds = decay;
        }
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        validate_phi(self.phi)?;
        if self.top_n == 0 {
            return Err(AnalysisError::InvalidParameter {
                name: "top_n",
                reason: "must be at least 1".to_string(),
            });
        }
        self.decay()?;
        Ok(())
    }

    pub fn decay(&self) -> AnalysisResult<DecayWeight> {
        DecayWeight::new(self.decay_half_life_seconds)
    }
}
