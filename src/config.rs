//! Marker-phrase configuration for the multi-task parser.
//!
//! The multi-task strategy infers progress from literal task-name phrases in
//! the wrapped tool's output. Those phrases change between upstream releases,
//! so they are loaded from configuration instead of being compiled in.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Literal marker phrases the multi-task parser keys on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Phrase opening the modification-discovery task; raises the counter
    /// maximum to `max_boost`.
    pub gptmd_start: String,
    /// Phrase closing the modification-discovery task; re-enables output.
    pub gptmd_finish: String,
    /// Phrases opening a search task; the run counted after one of these is
    /// the final one.
    pub search_starts: Vec<String>,
    /// Event text emitted once the final counted run completes.
    pub writing_output: String,
    /// Counter maximum once the modification-discovery task is present.
    pub max_boost: u64,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            gptmd_start: "Starting task: Task1GptmdTask".to_string(),
            gptmd_finish: "Finished task: Task1GptmdTask".to_string(),
            search_starts: vec![
                "Starting task: Task1SearchTask".to_string(),
                "Starting task: Task2SearchTask".to_string(),
            ],
            writing_output: "Writing MetaMorpheus output.".to_string(),
            max_boost: 200,
        }
    }
}

impl MarkerConfig {
    /// Length of the longest configured marker phrase, in bytes.
    #[must_use]
    pub fn longest_marker(&self) -> usize {
        self.search_starts
            .iter()
            .map(String::len)
            .chain([self.gptmd_start.len(), self.gptmd_finish.len()])
            .max()
            .unwrap_or(0)
    }
}

/// Configuration loader that searches multiple locations.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Search paths in order of priority.
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader with the default search paths.
    #[must_use]
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        // 1. Current directory: .search-supervisor.toml
        search_paths.push(PathBuf::from(".search-supervisor.toml"));

        // 2. User config directory: ~/.config/search-supervisor/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("search-supervisor").join("config.toml"));
        }

        Self { search_paths }
    }

    /// Create a loader with a specific config file path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
        }
    }

    /// Load configuration from the first available file, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<MarkerConfig, ConfigError> {
        for path in &self.search_paths {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading marker config");
                return Self::load_from_path(path);
            }
        }

        tracing::debug!("no marker config file found, using defaults");
        Ok(MarkerConfig::default())
    }

    fn load_from_path(path: &PathBuf) -> Result<MarkerConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            source: e,
        })
    }

    /// Get the search paths for debugging.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}
