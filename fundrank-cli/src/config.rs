//! Config file loading and creation for the fundrank CLI.
//!
//! Config lives at ~/.config/fundrank/config.toml.
//! All fields are optional; CLI args override config values.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::bail;

#[derive(Deserialize, Default)]
pub struct FundrankConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub comparisons: Option<usize>,
    pub concurrency: Option<usize>,
    pub budget: Option<u64>,
    pub exponent: Option<f64>,
    pub top_n: Option<usize>,
    pub seed: Option<u64>,
    pub prompt_template: Option<String>,
}

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# fundrank configuration
# All values here can be overridden by CLI flags.

# OpenAI-compatible API endpoint
# endpoint = \"http://localhost:8000\"

# Model ID
# model = \"Qwen/Qwen3-4B-Instruct-2507\"

# API key: use OPENAI_API_KEY env var or --api-key flag (not stored in config)

# Target number of pairwise comparisons (default: 4 per item)
# comparisons = 200

# Max concurrent LLM requests
# concurrency = 16

# Total budget to allocate, in integer units
# budget = 510000

# Zipf exponent for the allocation curve (> 0)
# exponent = 1.0

# Allocate only to the best N ranks
# top_n = 30

# RNG seed for a reproducible comparison schedule
# seed = 100

# Path to a custom prompt template file.
# The template must contain these variables: $criterion, $first, $second
# If not set, the built-in default prompt is used.
# prompt_template = \"/path/to/my-prompt.txt\"
";

/// Returns the default config path: ~/.config/fundrank/config.toml
pub fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| bail("HOME environment variable not set"));
    PathBuf::from(home).join(".config").join("fundrank").join("config.toml")
}

/// Load config from a file path. Returns default (all None) if file doesn't exist.
pub fn load_config(path: &Path) -> FundrankConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)
            .unwrap_or_else(|e| bail(format!("Failed to parse config at {}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => FundrankConfig::default(),
        Err(e) => bail(format!("Failed to read config at {}: {e}", path.display())),
    }
}

/// Create the default config file. Errors if it already exists.
pub fn create_default_config() -> PathBuf {
    let path = config_path();

    if path.exists() {
        bail(format!("Config file already exists at {}", path.display()));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .unwrap_or_else(|e| bail(format!("Failed to create directory {}: {e}", parent.display())));
    }

    std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE)
        .unwrap_or_else(|e| bail(format!("Failed to write config to {}: {e}", path.display())));

    path
}
