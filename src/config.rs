use crate::confidence::ConfidenceParams;
use crate::infer::PieceValues;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What to do when a pawn reaches the last rank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionPolicy {
    /// Stop and wait for the operator to name the piece.
    #[default]
    Ask,
    /// Assume a queen and flag the move as auto-promoted.
    AutoQueen,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub confidence: ConfidenceParams,
    pub piece_values: PieceValues,
    pub promotion: PromotionPolicy,
    /// Treat a diff that is the visible first part of a legal move (piece
    /// lifted, captured piece removed first) as a move in progress instead of
    /// a failed inference. It still desyncs once it outlives the mismatch window.
    pub allow_moves_in_progress: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            confidence: ConfidenceParams::default(),
            piece_values: PieceValues::default(),
            promotion: PromotionPolicy::default(),
            allow_moves_in_progress: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("parsing config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl WatchConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let cfg = Self::from_json_str(&text)?;
        log::info!("loaded config from {}", path.display());
        Ok(cfg)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> { Ok(serde_json::to_string_pretty(self)?) }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.confidence;
        let unit = [
            ("baseline", c.baseline),
            ("hard_floor", c.hard_floor),
            ("color_floor", c.color_floor),
            ("undo_resume_score", c.undo_resume_score),
        ];
        for (name, v) in unit {
            if !(0.0..=1.0).contains(&v) {
                return Err(ConfigError::Invalid(format!("confidence.{name} = {v} is outside [0, 1]")));
            }
        }
        let deltas = [
            ("reward", c.reward),
            ("ambiguity_penalty", c.ambiguity_penalty),
            ("low_color_penalty", c.low_color_penalty),
            ("slow_penalty", c.slow_penalty),
        ];
        for (name, v) in deltas {
            if !(v >= 0.0) {
                return Err(ConfigError::Invalid(format!("confidence.{name} = {v} must be non-negative")));
            }
        }
        if c.recovery_streak == 0 {
            return Err(ConfigError::Invalid("confidence.recovery_streak must be at least 1".to_string()));
        }
        if c.baseline < c.hard_floor {
            return Err(ConfigError::Invalid("confidence.baseline is below confidence.hard_floor".to_string()));
        }
        Ok(())
    }
}
