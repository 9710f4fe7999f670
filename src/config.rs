//! Engine Configuration
//!
//! Every field has a serde default, so an empty JSON object is a complete
//! configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hashing::DigestBackendKind;

pub const DEFAULT_REGISTRY_CAPACITY: usize = 1000;
pub const DEFAULT_STORAGE_KEY: &str = "logo_hash_registry";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: u8,
    #[serde(default)]
    pub digest_backend: DigestBackendKind,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

fn default_max_attempts() -> u32 { 5 }
fn default_quality_threshold() -> u8 { 70 }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

fn default_capacity() -> usize { DEFAULT_REGISTRY_CAPACITY }
fn default_storage_key() -> String { DEFAULT_STORAGE_KEY.to_string() }

/// Bands and canvas geometry used by the quality rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    /// Side length of the square design canvas; its center is the balance target.
    #[serde(default = "default_canvas_size")]
    pub canvas_size: f64,
    /// Fewer coordinate pairs than this yields the neutral balance score.
    #[serde(default = "default_min_coordinates")]
    pub min_coordinates: usize,
    #[serde(default = "default_optimal_commands")]
    pub optimal_commands: [usize; 2],
    #[serde(default = "default_optimal_paths")]
    pub optimal_paths: [usize; 2],
    #[serde(default = "default_curve_sweet_spot")]
    pub curve_sweet_spot: [usize; 2],
}

fn default_canvas_size() -> f64 { 100.0 }
fn default_min_coordinates() -> usize { 3 }
fn default_optimal_commands() -> [usize; 2] { [8, 60] }
fn default_optimal_paths() -> [usize; 2] { [1, 6] }
fn default_curve_sweet_spot() -> [usize; 2] { [4, 40] }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            quality_threshold: default_quality_threshold(),
            digest_backend: DigestBackendKind::default(),
            registry: RegistryConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            storage_key: default_storage_key(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            canvas_size: default_canvas_size(),
            min_coordinates: default_min_coordinates(),
            optimal_commands: default_optimal_commands(),
            optimal_paths: default_optimal_paths(),
            curve_sweet_spot: default_curve_sweet_spot(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("maxAttempts must be at least 1".into()));
        }
        if self.quality_threshold > 100 {
            return Err(ConfigError::Invalid(format!(
                "qualityThreshold must be within 0..=100, got {}",
                self.quality_threshold
            )));
        }
        if self.registry.capacity == 0 {
            return Err(ConfigError::Invalid("registry.capacity must be at least 1".into()));
        }
        if self.registry.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid("registry.storageKey must not be empty".into()));
        }
        self.scoring.validate()
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.canvas_size.is_finite() && self.canvas_size > 0.0) {
            return Err(ConfigError::Invalid("scoring.canvasSize must be positive".into()));
        }
        for (name, [lo, hi]) in [
            ("optimalCommands", self.optimal_commands),
            ("optimalPaths", self.optimal_paths),
            ("curveSweetSpot", self.curve_sweet_spot),
        ] {
            if lo == 0 || lo > hi {
                return Err(ConfigError::Invalid(format!(
                    "scoring.{} must be a non-empty band starting above zero, got [{}, {}]",
                    name, lo, hi
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.registry.capacity, 1000);
        assert_eq!(config.digest_backend, DigestBackendKind::Native);
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json_str(
            r#"{"maxAttempts": 3, "digestBackend": "portable", "scoring": {"canvasSize": 200}}"#,
        )
        .unwrap();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.digest_backend, DigestBackendKind::Portable);
        assert_eq!(config.scoring.canvas_size, 200.0);
        assert_eq!(config.scoring.optimal_paths, [1, 6]);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"maxAttempts": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"qualityThreshold": 101}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"scoring": {"optimalPaths": [5, 2]}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{"qualityThreshold": 85}"#).unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.quality_threshold, 85);
    }
}
