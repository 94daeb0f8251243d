use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// App configuration, read from `tally.toml`. Every field has a default
/// under the platform data directory, so a config file is optional and may
/// be partial.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source layout registry (the Pattern Table).
    pub patterns_file: PathBuf,
    /// Learned description → category corpus.
    pub corpus_file: PathBuf,
    /// Category / sub-category taxonomy.
    pub taxonomy_file: PathBuf,
    /// Fuzzy acceptance threshold in [0, 100].
    pub fuzzy_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        let data = data_dir();
        Config {
            patterns_file: data.join("patterns.csv"),
            corpus_file: data.join("references.csv"),
            taxonomy_file: data.join("categories.json"),
            fuzzy_threshold: tally_engine::DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

impl Config {
    /// Loads config from an explicit path (must exist) or from the default
    /// location (missing file falls back to defaults).
    pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (data_dir().join("tally.toml"), false),
        };
        if !path.exists() {
            if required {
                anyhow::bail!("config file not found: {}", path.display());
            }
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "tally", "Tally")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
