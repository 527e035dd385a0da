// src/config.rs
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::store::CollectorConfig;

const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
const ENV_OUTPUT_DIR: &str = "DIGEST_OUTPUT_DIR";
const ENV_SOURCE_TOKEN: &str = "SOURCE_API_TOKEN";

/// Host-level runtime settings: where output artifacts land and an optional
/// fallback credential for the chat source. Store-backed configuration
/// (collector rows, processor settings, interests) is loaded per job through
/// the `ConfigStore` contract, never from here.
#[derive(Debug, Clone, serde::Deserialize, PartialEq)]
pub struct RuntimeConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Fallback source API token when the collector row carries none.
    #[serde(default)]
    pub source_token: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            source_token: None,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// Load runtime config from an explicit path. Supports TOML or JSON formats.
pub fn load_from(path: &Path) -> Result<RuntimeConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading runtime config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let cfg = parse_config(&content, ext.as_str())?;
    Ok(apply_env_overrides(cfg))
}

/// Load runtime config using env var + fallbacks:
/// 1) $DIGEST_CONFIG_PATH
/// 2) config/digest.toml
/// 3) config/digest.json
/// 4) built-in defaults
/// Env values DIGEST_OUTPUT_DIR / SOURCE_API_TOKEN override file values.
pub fn load_default() -> Result<RuntimeConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_from(&pb);
        } else {
            return Err(anyhow!("DIGEST_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/digest.toml");
    if toml_p.exists() {
        return load_from(&toml_p);
    }
    let json_p = PathBuf::from("config/digest.json");
    if json_p.exists() {
        return load_from(&json_p);
    }
    Ok(apply_env_overrides(RuntimeConfig::default()))
}

fn apply_env_overrides(mut cfg: RuntimeConfig) -> RuntimeConfig {
    if let Ok(dir) = std::env::var(ENV_OUTPUT_DIR) {
        if !dir.trim().is_empty() {
            cfg.output_dir = PathBuf::from(dir);
        }
    }
    if let Ok(token) = std::env::var(ENV_SOURCE_TOKEN) {
        if !token.trim().is_empty() {
            cfg.source_token = Some(token);
        }
    }
    cfg
}

fn parse_config(s: &str, hint_ext: &str) -> Result<RuntimeConfig> {
    if hint_ext == "toml" {
        if let Ok(v) = toml::from_str(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = serde_json::from_str(s) {
        return Ok(v);
    }
    if hint_ext != "toml" {
        if let Ok(v) = toml::from_str(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported runtime config format"))
}

/// Resolve the API credential for a collector: the collector row wins, the
/// host-level fallback token covers rows that keep the credential out of the
/// store. `None` means the credential is genuinely missing.
pub fn resolve_source_token(
    collector: &CollectorConfig,
    runtime: &RuntimeConfig,
) -> Option<String> {
    collector
        .api_token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .or_else(|| runtime.source_token.clone())
}
