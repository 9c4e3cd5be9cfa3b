//! User configuration and custom function loading.
//!
//! Both live in the platform config dir (e.g. `~/.config/tabula` on Linux):
//! `config.toml` for settings and `default.rhai` for functions loaded on
//! every start.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::Deserialize;

use tabula_engine::engine::{EngineConfig, RhaiFormulaParser};

const MAX_CONFIG_FILE_BYTES: u64 = 256 * 1024;

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Function files loaded after `default.rhai`. Relative paths are
    /// resolved against the config file's directory.
    pub functions: Vec<PathBuf>,
    pub engine: EngineConfig,
}

fn config_dir() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "tabula")?;
    Some(proj.config_dir().to_path_buf())
}

pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

pub fn default_functions_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("default.rhai"))
}

impl Config {
    /// Load `explicit`, or the default config file if there is one.
    ///
    /// A missing default file yields the default config; a missing explicit
    /// file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.is_file() => path,
                _ => return Ok(Config::default()),
            },
        };

        let meta = fs::metadata(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        if meta.len() > MAX_CONFIG_FILE_BYTES {
            bail!(
                "Refusing to read {}: file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_CONFIG_FILE_BYTES
            );
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config = Config::parse(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if let Some(base) = path.parent() {
            for file in &mut config.functions {
                if file.is_relative() {
                    *file = base.join(&*file);
                }
            }
        }
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Config> {
        Ok(toml::from_str(content)?)
    }
}

/// Read and concatenate function scripts in order.
pub fn read_functions(paths: &[PathBuf]) -> Result<Option<String>> {
    let mut script: Option<String> = None;
    for path in paths {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Error loading functions from {}", path.display()))?;
        match &mut script {
            Some(existing) => {
                existing.push_str("\n\n");
                existing.push_str(&content);
            }
            None => script = Some(content),
        }
        log::debug!("loaded functions from {}", path.display());
    }
    Ok(script)
}

/// Build the formula parser: engine limits from `config`, functions from
/// `default.rhai` (unless disabled), the config file and `extra`, in that order.
pub fn build_parser(
    config: &Config,
    extra: &[PathBuf],
    no_default_functions: bool,
) -> Result<RhaiFormulaParser> {
    let mut files: Vec<PathBuf> = Vec::new();
    if !no_default_functions {
        if let Some(path) = default_functions_path().filter(|p| p.is_file()) {
            files.push(path);
        }
    }
    files.extend(config.functions.iter().cloned());
    files.extend(extra.iter().cloned());

    match read_functions(&files)? {
        Some(script) => {
            RhaiFormulaParser::with_functions(&config.engine, &script).map_err(anyhow::Error::msg)
        }
        None => Ok(RhaiFormulaParser::with_config(&config.engine)),
    }
}
